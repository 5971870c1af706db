//! Unified decoder front over the per-container modules.

use std::path::Path;

use crate::{
    detect::Container,
    error::CodecError,
    flac::FlacDecoder,
    mp3::Mp3Decoder,
    ogg::OggDecoder,
    pcm::PcmSpec,
    wav::WavDecoder,
};

/// A synchronous PCM reader over one audio file.
///
/// Opening is side-effect free: every call to [`PcmReader::open`] yields an
/// independent decoder position, so callers may hold several readers over
/// the same file.
pub enum PcmReader {
    Wav(WavDecoder),
    Mp3(Mp3Decoder),
    Flac(FlacDecoder),
    Ogg(OggDecoder),
}

impl PcmReader {
    /// Opens `path`, detecting the container by extension/magic.
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let container = Container::detect(path)?;
        Self::open_as(path, container)
    }

    /// Opens `path` as a known container.
    pub fn open_as(path: &Path, container: Container) -> Result<Self, CodecError> {
        match container {
            Container::Wav => Ok(PcmReader::Wav(WavDecoder::open(path)?)),
            Container::Mp3 => Ok(PcmReader::Mp3(Mp3Decoder::open(path)?)),
            Container::Flac => Ok(PcmReader::Flac(FlacDecoder::open(path)?)),
            Container::Ogg => Ok(PcmReader::Ogg(OggDecoder::open(path)?)),
        }
    }

    pub fn spec(&self) -> &PcmSpec {
        match self {
            PcmReader::Wav(inner) => inner.spec(),
            PcmReader::Mp3(inner) => inner.spec(),
            PcmReader::Flac(inner) => inner.spec(),
            PcmReader::Ogg(inner) => inner.spec(),
        }
    }

    /// Appends up to `max_frames` interleaved i16 frames (native rate and
    /// channel count) to `out`. Returns the number of frames appended;
    /// 0 is the EOF sentinel — decoders never substitute silence.
    pub fn read_frames(&mut self, out: &mut Vec<i16>, max_frames: usize) -> Result<usize, CodecError> {
        match self {
            PcmReader::Wav(inner) => inner.read_frames(out, max_frames),
            PcmReader::Mp3(inner) => inner.read_frames(out, max_frames),
            PcmReader::Flac(inner) => inner.read_frames(out, max_frames),
            PcmReader::Ogg(inner) => inner.read_frames(out, max_frames),
        }
    }
}
