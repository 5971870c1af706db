//! Scan-time probing: container, PCM format and duration of an audio file.

use std::path::Path;

use lofty::prelude::*;
use lofty::probe::Probe;

use crate::{detect::Container, error::CodecError, pcm::PcmSpec, reader::PcmReader};

/// What a theme scan learns about one audio file.
#[derive(Clone, Debug)]
pub struct ProbedAudio {
    pub container: Container,
    pub spec: PcmSpec,
    pub duration_secs: f64,
}

/// Probes `path`: detects the container, opens the decoder once to validate
/// the header, and determines the natural duration.
///
/// Duration comes from the container header when it declares a frame count;
/// otherwise (MP3, chained OGG) lofty's estimate is used. Files that fail
/// both decoding and probing are rejected so broken uploads never make it
/// into a theme.
pub fn probe(path: &Path) -> Result<ProbedAudio, CodecError> {
    let container = Container::detect(path)?;
    let reader = PcmReader::open_as(path, container)?;
    let spec = reader.spec().clone();

    let duration_secs = match spec.duration_secs() {
        Some(secs) => secs,
        None => lofty_duration(path).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "duration probe failed, assuming 0 s");
            0.0
        }),
    };

    Ok(ProbedAudio {
        container,
        spec,
        duration_secs,
    })
}

fn lofty_duration(path: &Path) -> Result<f64, CodecError> {
    let tagged = Probe::open(path)
        .map_err(|e| CodecError::Decode(e.to_string()))?
        .read()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(tagged.properties().duration().as_secs_f64())
}
