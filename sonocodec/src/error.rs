use std::io;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unsupported audio container: {0}")]
    Unsupported(String),
    #[error("MP3 encode error: {0}")]
    Encode(String),
}

impl From<claxon::Error> for CodecError {
    fn from(err: claxon::Error) -> Self {
        CodecError::Decode(err.to_string())
    }
}

impl From<lewton::VorbisError> for CodecError {
    fn from(err: lewton::VorbisError) -> Self {
        CodecError::Decode(err.to_string())
    }
}
