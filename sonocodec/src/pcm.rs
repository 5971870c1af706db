//! PCM stream metadata shared by all container decoders.

/// Format of the native PCM produced by a decoder, before any
/// downmix/resample towards the canonical mix format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcmSpec {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo, ...).
    pub channels: u16,
    /// Total frames per channel, when the container header declares it.
    /// `None` for streaming containers (MP3).
    pub total_frames: Option<u64>,
}

impl PcmSpec {
    /// Duration in seconds, when the frame count is known.
    pub fn duration_secs(&self) -> Option<f64> {
        self.total_frames
            .map(|frames| frames as f64 / self.sample_rate as f64)
    }
}
