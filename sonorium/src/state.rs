//! Shared application state handed to every route handler.

use std::sync::Arc;

use sonoaudio::StreamManager;
use sonotheme::{MetadataSaver, ThemeRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ThemeRegistry>,
    pub manager: Arc<StreamManager>,
    pub saver: MetadataSaver,
}
