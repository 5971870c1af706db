//! # MP3 Encoder Session
//!
//! Thin safe wrapper around LAME (via `mp3lame-encoder`) producing the wire
//! format every stream speaks: MPEG-1 Layer III, mono, 44.1 kHz, 128 kbps
//! CBR. One session per listener stream; sessions are not reusable across
//! streams because LAME carries bit-reservoir state between frames.

use mp3lame_encoder::{Builder, Encoder, FlushNoGap, MonoPcm};

use crate::error::CodecError;

/// Bitrate of every Sonorium stream, in kbps.
pub const STREAM_BITRATE_KBPS: u32 = 128;

/// LAME wants room for its tail even when flushing zero samples.
const FLUSH_BUFFER_SIZE: usize = 7200;

pub struct Mp3Encoder {
    encoder: Encoder,
}

impl Mp3Encoder {
    /// Opens a mono 44.1 kHz, 128 kbps CBR session.
    pub fn new() -> Result<Self, CodecError> {
        let mut builder =
            Builder::new().ok_or_else(|| CodecError::Encode("failed to create LAME context".into()))?;

        builder
            .set_num_channels(1)
            .map_err(|e| CodecError::Encode(format!("set_num_channels: {:?}", e)))?;
        builder
            .set_sample_rate(44_100)
            .map_err(|e| CodecError::Encode(format!("set_sample_rate: {:?}", e)))?;
        builder
            .set_brate(mp3lame_encoder::Birtate::Kbps128)
            .map_err(|e| CodecError::Encode(format!("set_brate: {:?}", e)))?;
        builder
            .set_quality(mp3lame_encoder::Quality::Best)
            .map_err(|e| CodecError::Encode(format!("set_quality: {:?}", e)))?;

        let encoder = builder
            .build()
            .map_err(|e| CodecError::Encode(format!("lame init: {:?}", e)))?;

        Ok(Self { encoder })
    }

    /// Encodes one chunk of mono i16 PCM, returning the MP3 bytes produced.
    ///
    /// LAME buffers internally, so the returned slice may be empty for the
    /// first call and longer than one frame later on.
    pub fn encode(&mut self, samples: &[i16]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(samples.len()));
        let written = self
            .encoder
            .encode(MonoPcm(samples), out.spare_capacity_mut())
            .map_err(|e| CodecError::Encode(format!("lame encode: {:?}", e)))?;
        // Safety: LAME wrote exactly `written` bytes into the spare capacity.
        unsafe { out.set_len(written) };
        Ok(out)
    }

    /// Flushes LAME's internal buffer, returning the final MP3 bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(FLUSH_BUFFER_SIZE);
        let written = self
            .encoder
            .flush::<FlushNoGap>(out.spare_capacity_mut())
            .map_err(|e| CodecError::Encode(format!("lame flush: {:?}", e)))?;
        // Safety: LAME wrote exactly `written` bytes into the spare capacity.
        unsafe { out.set_len(written) };
        Ok(out)
    }
}
