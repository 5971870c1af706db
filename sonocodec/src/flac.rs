//! # FLAC Decoder
//!
//! Block-based FLAC → PCM decoding on top of claxon. Samples are rescaled
//! from the stream's declared bit depth to i16.
//!
//! FLAC frames are byte-aligned and self-delimiting, so a fresh block
//! reader per refill resumes exactly where the previous one stopped.

use std::{fs::File, path::Path};

use crate::{error::CodecError, pcm::PcmSpec};

pub struct FlacDecoder {
    reader: claxon::FlacReader<File>,
    spec: PcmSpec,
    /// Right-shift applied to bring samples down to 16 bits (negative
    /// values mean a left shift for sub-16-bit streams).
    shift: i32,
    /// Recycled block buffer, claxon style.
    buffer: Vec<i32>,
    /// Interleaved i16 samples decoded ahead of consumption.
    pending: Vec<i16>,
    finished: bool,
}

impl FlacDecoder {
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let reader = claxon::FlacReader::open(path)?;
        let streaminfo = reader.streaminfo();

        let spec = PcmSpec {
            sample_rate: streaminfo.sample_rate,
            channels: streaminfo.channels as u16,
            total_frames: streaminfo.samples,
        };
        let shift = streaminfo.bits_per_sample as i32 - 16;

        Ok(Self {
            reader,
            spec,
            shift,
            buffer: Vec::new(),
            pending: Vec::new(),
            finished: false,
        })
    }

    pub fn spec(&self) -> &PcmSpec {
        &self.spec
    }

    /// Appends up to `max_frames` interleaved i16 frames to `out`.
    /// Returns the number of frames appended; 0 means EOF.
    pub fn read_frames(&mut self, out: &mut Vec<i16>, max_frames: usize) -> Result<usize, CodecError> {
        let channels = self.spec.channels as usize;
        let want_samples = max_frames * channels;
        let shift = self.shift;

        while self.pending.len() < want_samples && !self.finished {
            let buffer = std::mem::take(&mut self.buffer);
            let mut blocks = self.reader.blocks();
            match blocks.read_next_or_eof(buffer)? {
                Some(block) => {
                    let frames = block.duration() as usize;
                    self.pending.reserve(frames * channels);
                    for i in 0..frames {
                        for ch in 0..channels {
                            let s = block.channel(ch as u32)[i];
                            self.pending.push(rescale(s, shift));
                        }
                    }
                    self.buffer = block.into_buffer();
                }
                None => self.finished = true,
            }
        }

        let take = want_samples.min(self.pending.len());
        let take = take - (take % channels);
        out.extend(self.pending.drain(..take));
        Ok(take / channels)
    }
}

/// Rescales a sample from the stream bit depth to 16 bits.
fn rescale(sample: i32, shift: i32) -> i16 {
    let v = if shift >= 0 {
        sample >> shift
    } else {
        sample << (-shift)
    };
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
