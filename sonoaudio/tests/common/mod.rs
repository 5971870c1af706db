//! Shared fixtures: synthesized WAV files and theme folders on a tempdir.
#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

/// Writes a minimal mono/stereo 16-bit PCM WAV file.
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
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

/// A constant-amplitude signal; handy because any non-silent output is easy
/// to attribute.
pub fn constant(secs: f64, value: i16) -> Vec<i16> {
    vec![value; (secs * 44_100.0) as usize]
}

/// A full-period 440 Hz sine at the given peak amplitude.
pub fn sine_440(secs: f64, peak: f64) -> Vec<i16> {
    let n = (secs * 44_100.0) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / 44_100.0;
            (peak * (2.0 * std::f64::consts::PI * 440.0 * t).sin()) as i16
        })
        .collect()
}

pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}
