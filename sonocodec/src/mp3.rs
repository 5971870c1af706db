//! # MP3 Decoder
//!
//! Synchronous MP3 → PCM decoding on top of minimp3. The first frame is
//! decoded eagerly at open time so the stream format is known before any
//! audio is pulled; its samples are buffered and served first.
//!
//! MP3 carries no frame count in its header, so `total_frames` is `None`
//! and duration comes from the scan-time probe instead.

use std::{fs::File, io::BufReader, path::Path};

use minimp3::{Decoder as MiniMp3Decoder, Error as MiniMp3Error};

use crate::{error::CodecError, pcm::PcmSpec};

pub struct Mp3Decoder {
    decoder: MiniMp3Decoder<BufReader<File>>,
    spec: PcmSpec,
    /// Samples decoded ahead of consumption (first frame, leftovers).
    pending: Vec<i16>,
    finished: bool,
}

impl Mp3Decoder {
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let file = File::open(path)?;
        let mut decoder = MiniMp3Decoder::new(BufReader::new(file));

        // Pull frames until one decodes, to learn the stream format.
        let (first, spec) = loop {
            match decoder.next_frame() {
                Ok(frame) => {
                    if frame.channels == 0 {
                        return Err(CodecError::Decode(
                            "MP3 frame reported zero channels".into(),
                        ));
                    }
                    let spec = PcmSpec {
                        sample_rate: frame.sample_rate as u32,
                        channels: frame.channels as u16,
                        total_frames: None,
                    };
                    break (frame.data, spec);
                }
                Err(MiniMp3Error::Eof) => {
                    return Err(CodecError::Decode(
                        "stream contained no decodable MP3 frames".into(),
                    ));
                }
                Err(MiniMp3Error::InsufficientData) | Err(MiniMp3Error::SkippedData) => {
                    continue;
                }
                Err(MiniMp3Error::Io(err)) => return Err(CodecError::Io(err)),
            }
        };

        Ok(Self {
            decoder,
            spec,
            pending: first,
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

        while self.pending.len() < want_samples && !self.finished {
            match self.decoder.next_frame() {
                Ok(frame) => {
                    // Frames that switch format mid-stream are rare and
                    // usually decoder glitches; drop them.
                    if frame.channels != channels
                        || frame.sample_rate as u32 != self.spec.sample_rate
                    {
                        tracing::debug!(
                            channels = frame.channels,
                            sample_rate = frame.sample_rate,
                            "skipping MP3 frame with mismatched format"
                        );
                        continue;
                    }
                    self.pending.extend_from_slice(&frame.data);
                }
                Err(MiniMp3Error::Eof) => self.finished = true,
                Err(MiniMp3Error::InsufficientData) | Err(MiniMp3Error::SkippedData) => continue,
                Err(MiniMp3Error::Io(err)) => return Err(CodecError::Io(err)),
            }
        }

        let take = want_samples.min(self.pending.len());
        // Serve whole frames only
        let take = take - (take % channels);
        out.extend(self.pending.drain(..take));
        Ok(take / channels)
    }
}
