//! In-memory catalogue of themes with atomic rebuild-on-rescan.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use tracing::{info, warn};

use crate::{
    error::ThemeError,
    model::ThemeDefinition,
    scan::scan_themes,
    settings::{TrackPatch, TrackSettings},
};

/// Name-indexed map of `ThemeDefinition`s.
///
/// `rescan` swaps the whole map atomically: a failed scan keeps the previous
/// catalogue live, and streams pinned to a replaced definition keep playing
/// against it until they disconnect.
pub struct ThemeRegistry {
    root: PathBuf,
    themes: RwLock<HashMap<String, Arc<ThemeDefinition>>>,
}

impl ThemeRegistry {
    /// Scans `root` and builds the initial catalogue.
    pub fn open(root: PathBuf) -> Result<Self, ThemeError> {
        let themes = scan_themes(&root)?;
        Ok(Self {
            root,
            themes: RwLock::new(themes),
        })
    }

    /// Resolves a theme by sanitized id, accepting the persistent UUID as an
    /// alias.
    pub fn get(&self, theme_id: &str) -> Result<Arc<ThemeDefinition>, ThemeError> {
        let themes = self.themes.read().expect("registry lock poisoned");
        if let Some(theme) = themes.get(theme_id) {
            return Ok(theme.clone());
        }
        themes
            .values()
            .find(|t| t.uuid() == theme_id)
            .cloned()
            .ok_or_else(|| ThemeError::NotFound(theme_id.to_string()))
    }

    /// All themes, sorted by id for stable listings.
    pub fn list(&self) -> Vec<Arc<ThemeDefinition>> {
        let themes = self.themes.read().expect("registry lock poisoned");
        let mut all: Vec<_> = themes.values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// Rebuilds the catalogue from disk and swaps it in. On scan failure the
    /// previous catalogue stays untouched.
    pub fn rescan(&self) -> Result<usize, ThemeError> {
        match scan_themes(&self.root) {
            Ok(new_themes) => {
                let count = new_themes.len();
                let mut themes = self.themes.write().expect("registry lock poisoned");
                *themes = new_themes;
                info!(count, "Registry rescanned");
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "Rescan failed, keeping previous registry");
                Err(err)
            }
        }
    }

    /// Applies a validated patch to one track. Takes effect on the next
    /// mixdown tick of every live listener.
    pub fn update_track(
        &self,
        theme_id: &str,
        track_name: &str,
        patch: &TrackPatch,
    ) -> Result<TrackSettings, ThemeError> {
        patch.validate()?;
        let theme = self.get(theme_id)?;
        let track = theme.track(track_name)?;
        Ok(track.apply_patch(patch))
    }

    /// Sets a theme's master gain.
    pub fn set_master_gain(&self, theme_id: &str, gain: f64) -> Result<(), ThemeError> {
        let theme = self.get(theme_id)?;
        theme.set_master_gain(gain)
    }

    /// Persists one theme's metadata.json (read-modify-write, the retained
    /// unknown keys included). Called by the debounced saver.
    pub fn write_metadata(&self, theme_id: &str) -> Result<(), ThemeError> {
        let theme = self.get(theme_id)?;
        let meta = theme.to_metadata();
        meta.save(theme.folder())
    }
}
