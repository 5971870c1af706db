//! # WAV (RIFF) Decoder
//!
//! Streaming WAV → PCM conversion with zero seeking beyond the header. The
//! decoder reads the RIFF header incrementally, validates the format, and
//! then serves `data` chunk payload as i16 frames. 8/16/24/32-bit integer
//! PCM and 32-bit float are accepted; everything is converted to i16.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{error::CodecError, pcm::PcmSpec};

/// PCM format metadata extracted from the WAV `fmt ` chunk.
#[derive(Clone, Debug)]
struct FmtChunk {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

impl FmtChunk {
    fn validate(&self) -> Result<(), CodecError> {
        if !(self.audio_format == 0x0001 || self.audio_format == 0x0003) {
            return Err(CodecError::Decode(format!(
                "unsupported WAV audio format: {}",
                self.audio_format
            )));
        }
        if self.channels == 0 {
            return Err(CodecError::Decode("WAV channel count must be > 0".into()));
        }
        if self.sample_rate == 0 {
            return Err(CodecError::Decode("WAV sample rate must be > 0".into()));
        }
        let ok_bits = match self.audio_format {
            0x0003 => self.bits_per_sample == 32,
            _ => matches!(self.bits_per_sample, 8 | 16 | 24 | 32),
        };
        if !ok_bits {
            return Err(CodecError::Decode(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        Ok(())
    }

    fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

/// Synchronous WAV decoder producing interleaved i16 frames.
pub struct WavDecoder {
    reader: BufReader<File>,
    fmt: FmtChunk,
    spec: PcmSpec,
    /// Bytes of `data` payload not yet consumed.
    remaining: u64,
}

impl WavDecoder {
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut riff = [0u8; 12];
        reader.read_exact(&mut riff)?;
        if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
            return Err(CodecError::Decode("not a RIFF/WAVE file".into()));
        }

        let mut fmt: Option<FmtChunk> = None;

        // Walk chunks until `data`; `fmt ` must come first per spec, but
        // tolerate any ordering as long as fmt precedes data.
        loop {
            let mut header = [0u8; 8];
            reader.read_exact(&mut header).map_err(|_| {
                CodecError::Decode("unexpected EOF before WAV data chunk".into())
            })?;
            let id = &header[0..4];
            let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as u64;

            match id {
                b"fmt " => {
                    if size < 16 {
                        return Err(CodecError::Decode("WAV fmt chunk too short".into()));
                    }
                    let mut body = vec![0u8; size as usize];
                    reader.read_exact(&mut body)?;
                    let chunk = FmtChunk {
                        audio_format: u16::from_le_bytes([body[0], body[1]]),
                        channels: u16::from_le_bytes([body[2], body[3]]),
                        sample_rate: u32::from_le_bytes([body[4], body[5], body[6], body[7]]),
                        bits_per_sample: u16::from_le_bytes([body[14], body[15]]),
                    };
                    chunk.validate()?;
                    fmt = Some(chunk);
                }
                b"data" => {
                    let fmt = fmt.ok_or_else(|| {
                        CodecError::Decode("WAV data chunk before fmt chunk".into())
                    })?;
                    let frame_width = fmt.bytes_per_frame() as u64;
                    let total_frames = size / frame_width;
                    let spec = PcmSpec {
                        sample_rate: fmt.sample_rate,
                        channels: fmt.channels,
                        total_frames: Some(total_frames),
                    };
                    return Ok(Self {
                        reader,
                        fmt,
                        spec,
                        remaining: total_frames * frame_width,
                    });
                }
                _ => {
                    // Skip unknown chunk (word-aligned)
                    let skip = size + (size & 1);
                    std::io::copy(&mut (&mut reader).take(skip), &mut std::io::sink())?;
                }
            }
        }
    }

    pub fn spec(&self) -> &PcmSpec {
        &self.spec
    }

    /// Appends up to `max_frames` interleaved i16 frames to `out`.
    /// Returns the number of frames appended; 0 means EOF.
    pub fn read_frames(&mut self, out: &mut Vec<i16>, max_frames: usize) -> Result<usize, CodecError> {
        if self.remaining == 0 {
            return Ok(0);
        }

        let frame_width = self.fmt.bytes_per_frame();
        let frames_left = (self.remaining / frame_width as u64) as usize;
        let frames = max_frames.min(frames_left);
        if frames == 0 {
            self.remaining = 0;
            return Ok(0);
        }

        let mut raw = vec![0u8; frames * frame_width];
        let mut filled = 0;
        while filled < raw.len() {
            let n = self.reader.read(&mut raw[filled..])?;
            if n == 0 {
                break; // truncated file; serve what we have
            }
            filled += n;
        }
        let whole_frames = filled / frame_width;
        if whole_frames == 0 {
            self.remaining = 0;
            return Ok(0);
        }
        self.remaining -= (whole_frames * frame_width) as u64;
        if filled < raw.len() {
            // Short read means the data chunk lied about its length.
            self.remaining = 0;
        }

        let bytes = &raw[..whole_frames * frame_width];
        match (self.fmt.audio_format, self.fmt.bits_per_sample) {
            (0x0001, 8) => {
                for &b in bytes {
                    out.push(((b as i16) - 128) << 8);
                }
            }
            (0x0001, 16) => {
                for pair in bytes.chunks_exact(2) {
                    out.push(i16::from_le_bytes([pair[0], pair[1]]));
                }
            }
            (0x0001, 24) => {
                for tri in bytes.chunks_exact(3) {
                    let v = ((tri[2] as i8 as i32) << 16)
                        | ((tri[1] as i32) << 8)
                        | (tri[0] as i32);
                    out.push((v >> 8) as i16);
                }
            }
            (0x0001, 32) => {
                for quad in bytes.chunks_exact(4) {
                    let v = i32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                    out.push((v >> 16) as i16);
                }
            }
            (0x0003, 32) => {
                for quad in bytes.chunks_exact(4) {
                    let v = f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                    out.push((v.clamp(-1.0, 1.0) * 32767.0) as i16);
                }
            }
            (format, bits) => {
                return Err(CodecError::Decode(format!(
                    "unsupported WAV layout: format {} / {} bits",
                    format, bits
                )));
            }
        }

        Ok(whole_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Writes a minimal 16-bit PCM WAV file.
    pub(crate) fn write_wav_i16(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let mut file = File::create(path).unwrap();
        let data_len = (samples.len() * 2) as u32;
        let byte_rate = sample_rate * channels as u32 * 2;
        let block_align = channels * 2;

        file.write_all(b"RIFF").unwrap();
        file.write_all(&(36 + data_len).to_le_bytes()).unwrap();
        file.write_all(b"WAVE").unwrap();
        file.write_all(b"fmt ").unwrap();
        file.write_all(&16u32.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&channels.to_le_bytes()).unwrap();
        file.write_all(&sample_rate.to_le_bytes()).unwrap();
        file.write_all(&byte_rate.to_le_bytes()).unwrap();
        file.write_all(&block_align.to_le_bytes()).unwrap();
        file.write_all(&16u16.to_le_bytes()).unwrap();
        file.write_all(b"data").unwrap();
        file.write_all(&data_len.to_le_bytes()).unwrap();
        for s in samples {
            file.write_all(&s.to_le_bytes()).unwrap();
        }
    }

    #[test]
    fn decode_roundtrip_i16_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..1000).map(|i| (i % 100) as i16 * 100).collect();
        write_wav_i16(&path, 44_100, 1, &samples);

        let mut decoder = WavDecoder::open(&path).unwrap();
        assert_eq!(decoder.spec().sample_rate, 44_100);
        assert_eq!(decoder.spec().channels, 1);
        assert_eq!(decoder.spec().total_frames, Some(1000));

        let mut out = Vec::new();
        loop {
            if decoder.read_frames(&mut out, 256).unwrap() == 0 {
                break;
            }
        }
        assert_eq!(out, samples);
    }

    #[test]
    fn decode_stereo_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let samples: Vec<i16> = vec![100, -100].repeat(500); // 500 stereo frames
        write_wav_i16(&path, 22_050, 2, &samples);

        let mut decoder = WavDecoder::open(&path).unwrap();
        assert_eq!(decoder.spec().total_frames, Some(500));

        let mut out = Vec::new();
        let n = decoder.read_frames(&mut out, 10_000).unwrap();
        assert_eq!(n, 500);
        assert_eq!(out.len(), 1000);
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"this is not audio").unwrap();

        assert!(matches!(
            WavDecoder::open(&path),
            Err(CodecError::Decode(_)) | Err(CodecError::Io(_))
        ));
    }

    #[test]
    fn eof_is_zero_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_wav_i16(&path, 44_100, 1, &[1, 2, 3]);

        let mut decoder = WavDecoder::open(&path).unwrap();
        let mut out = Vec::new();
        assert_eq!(decoder.read_frames(&mut out, 100).unwrap(), 3);
        assert_eq!(decoder.read_frames(&mut out, 100).unwrap(), 0);
        assert_eq!(decoder.read_frames(&mut out, 100).unwrap(), 0);
    }
}
