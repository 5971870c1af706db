//! Canonical-format PCM source over one recording.

use sonocodec::{CodecError, PcmReader};
use sonotheme::Recording;

use crate::{
    dsp::{downmix_to_mono, LinearResampler},
    SAMPLE_RATE,
};

/// Native frames pulled from the decoder per refill.
const READ_FRAMES: usize = 4096;

/// A restartable reader producing the canonical internal format (mono,
/// signed 16-bit, 44.1 kHz) from one recording.
///
/// Opening is side-effect free: each open yields an independent decoder
/// position, which is what lets every listener run its own cadence over the
/// same shared `TrackInstance`.
pub struct CanonicalSource {
    reader: PcmReader,
    channels: usize,
    resampler: LinearResampler,
    /// Scratch: native interleaved frames straight from the decoder.
    native: Vec<i16>,
    /// Scratch: downmixed mono at native rate.
    mono: Vec<i16>,
    /// Canonical samples decoded ahead of consumption.
    pending: Vec<i16>,
    pending_pos: usize,
    eof: bool,
}

impl CanonicalSource {
    pub fn open(recording: &Recording) -> Result<Self, CodecError> {
        let reader = PcmReader::open_as(recording.path(), recording.container())?;
        let spec = reader.spec().clone();
        Ok(Self {
            reader,
            channels: spec.channels as usize,
            resampler: LinearResampler::new(spec.sample_rate, SAMPLE_RATE),
            native: Vec::new(),
            mono: Vec::new(),
            pending: Vec::new(),
            pending_pos: 0,
            eof: false,
        })
    }

    /// Fills as much of `out` as the file still holds.
    ///
    /// Returns the number of samples written; `0` is the EOF sentinel —
    /// silence is never substituted here, padding is the scheduler's call.
    pub fn read_into(&mut self, out: &mut [i16]) -> Result<usize, CodecError> {
        let mut written = 0;

        while written < out.len() {
            if self.pending_pos < self.pending.len() {
                let available = self.pending.len() - self.pending_pos;
                let take = available.min(out.len() - written);
                out[written..written + take]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + take]);
                self.pending_pos += take;
                written += take;
                continue;
            }

            if self.eof {
                break;
            }

            self.pending.clear();
            self.pending_pos = 0;
            self.native.clear();
            let frames = self.reader.read_frames(&mut self.native, READ_FRAMES)?;
            if frames == 0 {
                self.eof = true;
                continue;
            }

            self.mono.clear();
            downmix_to_mono(&self.native, self.channels, &mut self.mono);
            let mono = std::mem::take(&mut self.mono);
            self.resampler.process(&mono, &mut self.pending);
            self.mono = mono;
        }

        Ok(written)
    }

    pub fn is_eof(&self) -> bool {
        self.eof && self.pending_pos >= self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonocodec::Container;
    use std::io::Write;

    fn write_wav(path: &std::path::Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let mut file = std::fs::File::create(path).unwrap();
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        file.write_all(b"RIFF").unwrap();
        file.write_all(&(36 + data_len).to_le_bytes()).unwrap();
        file.write_all(b"WAVE").unwrap();
        file.write_all(b"fmt ").unwrap();
        file.write_all(&16u32.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&channels.to_le_bytes()).unwrap();
        file.write_all(&sample_rate.to_le_bytes()).unwrap();
        file.write_all(&(sample_rate * block_align as u32).to_le_bytes())
            .unwrap();
        file.write_all(&block_align.to_le_bytes()).unwrap();
        file.write_all(&16u16.to_le_bytes()).unwrap();
        file.write_all(b"data").unwrap();
        file.write_all(&data_len.to_le_bytes()).unwrap();
        for s in samples {
            file.write_all(&s.to_le_bytes()).unwrap();
        }
    }

    fn recording_for(path: &std::path::Path, duration: f64, frames: u64) -> Recording {
        Recording::new(path.to_path_buf(), Container::Wav, duration, Some(frames))
    }

    #[test]
    fn canonical_passthrough_for_mono_44100() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..10_000).map(|i| (i % 1000) as i16).collect();
        write_wav(&path, 44_100, 1, &samples);

        let recording = recording_for(&path, 10_000.0 / 44_100.0, 10_000);
        let mut source = CanonicalSource::open(&recording).unwrap();

        let mut buf = vec![0i16; 4096];
        let mut all = Vec::new();
        loop {
            let n = source.read_into(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            all.extend_from_slice(&buf[..n]);
        }
        assert_eq!(all, samples);
        assert!(source.is_eof());
    }

    #[test]
    fn stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // L = 1000, R = 3000 everywhere → mono 2000
        let samples: Vec<i16> = [1000, 3000].repeat(2000);
        write_wav(&path, 44_100, 2, &samples);

        let recording = recording_for(&path, 2000.0 / 44_100.0, 2000);
        let mut source = CanonicalSource::open(&recording).unwrap();

        let mut buf = vec![0i16; 512];
        let n = source.read_into(&mut buf).unwrap();
        assert_eq!(n, 512);
        assert!(buf.iter().all(|&s| s == 2000));
    }

    #[test]
    fn resamples_non_canonical_rates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.wav");
        // 1 second at 22.05 kHz
        let samples = vec![5000i16; 22_050];
        write_wav(&path, 22_050, 1, &samples);

        let recording = recording_for(&path, 1.0, 22_050);
        let mut source = CanonicalSource::open(&recording).unwrap();

        let mut buf = vec![0i16; 8192];
        let mut total = 0usize;
        loop {
            let n = source.read_into(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        // ~1 second of canonical output
        let expected = SAMPLE_RATE as usize;
        assert!(
            (total as i64 - expected as i64).abs() < 16,
            "expected ~{} canonical samples, got {}",
            expected,
            total
        );
    }

    #[test]
    fn independent_opens_have_independent_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..4096).map(|i| i as i16).collect();
        write_wav(&path, 44_100, 1, &samples);

        let recording = recording_for(&path, 4096.0 / 44_100.0, 4096);
        let mut a = CanonicalSource::open(&recording).unwrap();
        let mut b = CanonicalSource::open(&recording).unwrap();

        let mut buf_a = vec![0i16; 100];
        a.read_into(&mut buf_a).unwrap();
        a.read_into(&mut buf_a).unwrap();

        let mut buf_b = vec![0i16; 100];
        b.read_into(&mut buf_b).unwrap();
        assert_eq!(buf_b[0], 0);
        assert_eq!(buf_b[99], 99);
    }
}
