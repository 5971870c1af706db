//! Container detection by extension, with a magic-byte fallback for files
//! whose extension lies or is missing.

use std::{
    fs::File,
    io::Read,
    path::Path,
};

use crate::error::CodecError;

/// Audio containers Sonorium can decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl Container {
    /// File extensions accepted during theme scans.
    pub const EXTENSIONS: [&'static str; 4] = ["mp3", "wav", "flac", "ogg"];

    pub fn from_extension(ext: &str) -> Option<Container> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Container::Wav),
            "mp3" => Some(Container::Mp3),
            "flac" => Some(Container::Flac),
            "ogg" => Some(Container::Ogg),
            _ => None,
        }
    }

    /// Identifies a container from its leading bytes.
    pub fn sniff(header: &[u8]) -> Option<Container> {
        if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE" {
            return Some(Container::Wav);
        }
        if header.len() >= 4 && &header[0..4] == b"fLaC" {
            return Some(Container::Flac);
        }
        if header.len() >= 4 && &header[0..4] == b"OggS" {
            return Some(Container::Ogg);
        }
        if header.len() >= 3 && &header[0..3] == b"ID3" {
            return Some(Container::Mp3);
        }
        // Bare MPEG frame sync
        if header.len() >= 2 && header[0] == 0xFF && (header[1] & 0xE0) == 0xE0 {
            return Some(Container::Mp3);
        }
        None
    }

    /// Detects the container of `path`, trusting the extension first and
    /// sniffing the file header when the extension is unknown.
    pub fn detect(path: &Path) -> Result<Container, CodecError> {
        if let Some(container) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Container::from_extension)
        {
            return Ok(container);
        }

        let mut file = File::open(path)?;
        let mut header = [0u8; 12];
        let read = file.read(&mut header)?;

        Container::sniff(&header[..read])
            .ok_or_else(|| CodecError::Unsupported(path.display().to_string()))
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Container::Wav => "wav",
            Container::Mp3 => "mp3",
            Container::Flac => "flac",
            Container::Ogg => "ogg",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection() {
        assert_eq!(Container::from_extension("WAV"), Some(Container::Wav));
        assert_eq!(Container::from_extension("mp3"), Some(Container::Mp3));
        assert_eq!(Container::from_extension("m4a"), None);
    }

    #[test]
    fn sniff_wav_header() {
        let mut header = Vec::new();
        header.extend_from_slice(b"RIFF");
        header.extend_from_slice(&36u32.to_le_bytes());
        header.extend_from_slice(b"WAVE");
        assert_eq!(Container::sniff(&header), Some(Container::Wav));
    }

    #[test]
    fn sniff_flac_ogg_mp3() {
        assert_eq!(Container::sniff(b"fLaC...."), Some(Container::Flac));
        assert_eq!(Container::sniff(b"OggS...."), Some(Container::Ogg));
        assert_eq!(Container::sniff(b"ID3\x04...."), Some(Container::Mp3));
        assert_eq!(Container::sniff(&[0xFF, 0xFB, 0x90, 0x00]), Some(Container::Mp3));
        assert_eq!(Container::sniff(b"junk"), None);
    }
}
