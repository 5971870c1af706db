//! Per-track settings as stored in `metadata.json` and mutated live by the
//! control plane.

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;

/// How a track's scheduler paces playback.
///
/// `Auto` resolves at scheduling time: files shorter than the theme's
/// `short_file_threshold` become `Sparse`, longer ones `Continuous`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    Auto,
    Continuous,
    Sparse,
    Presence,
}

/// Per-track settings stored in metadata.json.
///
/// Unknown keys written by other tools land in `extra` and survive
/// read-modify-write.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackSettings {
    /// [0, 1] probability weight for sparse/presence cadence.
    #[serde(default = "default_presence")]
    pub presence: f64,
    /// [0, 1] linear amplitude before mixdown.
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub playback_mode: PlaybackMode,
    #[serde(default)]
    pub seamless_loop: bool,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_presence() -> f64 {
    1.0
}

fn default_volume() -> f64 {
    1.0
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            presence: 1.0,
            volume: 1.0,
            muted: false,
            playback_mode: PlaybackMode::Auto,
            seamless_loop: false,
            exclusive: false,
            extra: serde_json::Map::new(),
        }
    }
}

/// A partial update of track settings, as posted by the control API.
///
/// `enabled` lives here too although it is runtime state on the
/// TrackInstance, not a persisted setting.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TrackPatch {
    pub presence: Option<f64>,
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub enabled: Option<bool>,
    pub playback_mode: Option<PlaybackMode>,
    pub seamless_loop: Option<bool>,
    pub exclusive: Option<bool>,
}

impl TrackPatch {
    /// Range-checks the patch. Violations map to HTTP 400 upstream.
    pub fn validate(&self) -> Result<(), ThemeError> {
        if let Some(presence) = self.presence {
            if !(0.0..=1.0).contains(&presence) || !presence.is_finite() {
                return Err(ThemeError::Invalid(format!(
                    "presence must be in [0, 1], got {}",
                    presence
                )));
            }
        }
        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) || !volume.is_finite() {
                return Err(ThemeError::Invalid(format!(
                    "volume must be in [0, 1], got {}",
                    volume
                )));
            }
        }
        Ok(())
    }

    /// Applies the persisted fields onto `settings` (not `enabled`).
    pub fn apply(&self, settings: &mut TrackSettings) {
        if let Some(presence) = self.presence {
            settings.presence = presence;
        }
        if let Some(volume) = self.volume {
            settings.volume = volume;
        }
        if let Some(muted) = self.muted {
            settings.muted = muted;
        }
        if let Some(mode) = self.playback_mode {
            settings.playback_mode = mode;
        }
        if let Some(seamless) = self.seamless_loop {
            settings.seamless_loop = seamless;
        }
        if let Some(exclusive) = self.exclusive {
            settings.exclusive = exclusive;
        }
    }
}
