//! # OGG/Vorbis Decoder
//!
//! Packet-based Vorbis → PCM decoding on top of lewton. Packets arrive as
//! interleaved i16, which is already the sample type we serve.

use std::{fs::File, path::Path};

use lewton::inside_ogg::OggStreamReader;

use crate::{error::CodecError, pcm::PcmSpec};

pub struct OggDecoder {
    reader: OggStreamReader<File>,
    spec: PcmSpec,
    pending: Vec<i16>,
    finished: bool,
}

impl OggDecoder {
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let file = File::open(path)?;
        let reader = OggStreamReader::new(file)?;

        let spec = PcmSpec {
            sample_rate: reader.ident_hdr.audio_sample_rate,
            channels: reader.ident_hdr.audio_channels as u16,
            total_frames: None,
        };

        Ok(Self {
            reader,
            spec,
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

        while self.pending.len() < want_samples && !self.finished {
            match self.reader.read_dec_packet_itl()? {
                Some(packet) => self.pending.extend_from_slice(&packet),
                None => self.finished = true,
            }
        }

        let take = want_samples.min(self.pending.len());
        let take = take - (take % channels);
        out.extend(self.pending.drain(..take));
        Ok(take / channels)
    }
}
