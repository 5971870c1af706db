//! # sonotheme — theme catalogue and persistence for Sonorium
//!
//! A theme is a folder of audio files plus its `metadata.json`. This crate
//! owns the on-disk contract (scan, identity, settings persistence with
//! unknown-key preservation) and the shared runtime model the audio engine
//! schedules from.

mod error;
mod metadata;
mod model;
mod registry;
mod saver;
mod scan;
mod settings;

pub use error::ThemeError;
pub use metadata::{ThemeMetadata, DEFAULT_MASTER_GAIN, DEFAULT_SHORT_FILE_THRESHOLD, METADATA_FILE};
pub use model::{Recording, ThemeDefinition, TrackInstance};
pub use registry::ThemeRegistry;
pub use saver::MetadataSaver;
pub use scan::scan_themes;
pub use settings::{PlaybackMode, TrackPatch, TrackSettings};
