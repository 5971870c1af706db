//! # sonocodec — audio container I/O for Sonorium
//!
//! Synchronous decoders for the containers a theme folder may hold
//! (WAV, MP3, FLAC, OGG/Vorbis) plus the LAME-backed MP3 encoder session
//! used on the stream side.
//!
//! Decoders produce native-format interleaved i16 frames; downmix and
//! resampling to the canonical mix format happen upstream in `sonoaudio`.
//! All decoders share the same contract: `read_frames` appends whole frames
//! and returns how many, with `0` as the EOF sentinel.

mod detect;
mod error;
mod flac;
mod mp3;
mod mp3enc;
mod ogg;
mod pcm;
mod probe;
mod reader;
mod wav;

pub use detect::Container;
pub use error::CodecError;
pub use mp3enc::{Mp3Encoder, STREAM_BITRATE_KBPS};
pub use pcm::PcmSpec;
pub use probe::{probe, ProbedAudio};
pub use reader::PcmReader;
