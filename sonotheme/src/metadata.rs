//! Theme metadata as stored in each theme folder's `metadata.json`.
//!
//! All theme-specific state lives in this file, which keeps themes portable:
//! moving or renaming a folder preserves every setting. The `id` field is a
//! persistent UUID generated on first scan; folder names are just filesystem
//! paths mapped to it.
//!
//! Write-back is strictly read-modify-write: keys this implementation does
//! not know about (plugin-supplied fields, future versions) are carried in
//! `extra` maps and survive every save.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ThemeError, settings::TrackSettings};

pub const METADATA_FILE: &str = "metadata.json";

/// Default master gain, corresponding to the UI's "60%" volume.
pub const DEFAULT_MASTER_GAIN: f64 = 6.0;

/// Files shorter than this many seconds resolve `auto` mode to `sparse`.
pub const DEFAULT_SHORT_FILE_THRESHOLD: f64 = 15.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeMetadata {
    /// Persistent unique identifier (generated once, never changes).
    #[serde(default)]
    pub id: String,

    /// Display name (can change without affecting identity).
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Emoji or icon hint; empty for auto-detect.
    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub is_favorite: bool,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default = "default_short_file_threshold")]
    pub short_file_threshold: f64,

    #[serde(default = "default_master_gain")]
    pub master_gain: f64,

    /// Per-track settings keyed by file name.
    #[serde(default)]
    pub tracks: BTreeMap<String, TrackSettings>,

    /// Saved mix presets; opaque to the core.
    #[serde(default)]
    pub presets: serde_json::Map<String, serde_json::Value>,

    /// Attribution info for imported themes; opaque to the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<serde_json::Value>,

    /// Any key we do not know about.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_short_file_threshold() -> f64 {
    DEFAULT_SHORT_FILE_THRESHOLD
}

fn default_master_gain() -> f64 {
    DEFAULT_MASTER_GAIN
}

impl Default for ThemeMetadata {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            icon: String::new(),
            is_favorite: false,
            categories: Vec::new(),
            short_file_threshold: DEFAULT_SHORT_FILE_THRESHOLD,
            master_gain: DEFAULT_MASTER_GAIN,
            tracks: BTreeMap::new(),
            presets: serde_json::Map::new(),
            attribution: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl ThemeMetadata {
    /// Loads `metadata.json` from a theme folder.
    pub fn load(folder: &Path) -> Result<ThemeMetadata, ThemeError> {
        let path = folder.join(METADATA_FILE);
        let text = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Saves this metadata into a theme folder.
    pub fn save(&self, folder: &Path) -> Result<(), ThemeError> {
        let path = folder.join(METADATA_FILE);
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, text)?;
        Ok(())
    }

    /// Settings for a track, falling back to defaults when absent.
    pub fn track_settings(&self, track_name: &str) -> TrackSettings {
        self.tracks.get(track_name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "id": "abc-123",
            "name": "Rainy Night",
            "plugin_state": {"imported": true},
            "tracks": {
                "rain.wav": {"volume": 0.7, "custom": 42}
            }
        });
        std::fs::write(
            dir.path().join(METADATA_FILE),
            serde_json::to_string_pretty(&json).unwrap(),
        )
        .unwrap();

        let meta = ThemeMetadata::load(dir.path()).unwrap();
        assert_eq!(meta.id, "abc-123");
        assert_eq!(meta.name, "Rainy Night");
        assert_eq!(meta.track_settings("rain.wav").volume, 0.7);

        meta.save(dir.path()).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap())
                .unwrap();

        assert_eq!(raw["plugin_state"]["imported"], true);
        assert_eq!(raw["tracks"]["rain.wav"]["custom"], 42);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let meta: ThemeMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.short_file_threshold, 15.0);
        assert_eq!(meta.master_gain, 6.0);
        assert!(meta.tracks.is_empty());
    }

    #[test]
    fn absent_track_gets_default_settings() {
        let meta = ThemeMetadata::default();
        let settings = meta.track_settings("anything.mp3");
        assert_eq!(settings.volume, 1.0);
    }
}
