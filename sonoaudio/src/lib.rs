//! # sonoaudio — the Sonorium audio engine
//!
//! Everything between decoded file and MP3 byte stream:
//!
//! - [`PcmChunk`] — the universal mix unit (4096 mono i16 samples @ 44.1 kHz)
//! - [`CanonicalSource`] — restartable canonical-format reader over a recording
//! - [`TrackScheduler`] — per-listener cadence state machine
//! - [`Mixer`] — per-tick sum / √N normalization / master gain
//! - [`RealTimePacer`] — wall-clock pacing with bounded slack
//! - [`StreamManager`] / [`ListenerStream`] — per-listener worker + channel
//!   bridge to the HTTP layer
//!
//! Data flows `CanonicalSource → TrackScheduler → Mixer → Mp3Encoder →
//! ListenerStream`; every stage trades in [`PcmChunk`]s, which is what
//! bounds control-plane latency to one chunk (~93 ms).

mod chunk;
pub mod dsp;
mod mixer;
mod pacer;
mod scheduler;
mod source;
mod stream;

/// Canonical sample rate of the internal format, in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples per mixdown chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Duration of one chunk in seconds (~93 ms).
pub const CHUNK_SECS: f64 = CHUNK_SIZE as f64 / SAMPLE_RATE as f64;

pub use chunk::PcmChunk;
pub use mixer::Mixer;
pub use pacer::RealTimePacer;
pub use scheduler::{cadence_seed, ExclusiveGate, TrackScheduler};
pub use source::CanonicalSource;
pub use stream::{ListenerStream, StreamError, StreamManager};
