use std::io;

#[derive(thiserror::Error, Debug)]
pub enum ThemeError {
    #[error("theme not found: {0}")]
    NotFound(String),
    #[error("track not found: {0}")]
    TrackNotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}
