//! Runtime model of a theme: immutable recordings, shared mutable track
//! instances, and the theme definition that groups them.
//!
//! Sharing rules (they carry the whole concurrency story):
//! - `Recording` is immutable; equality is path equality.
//! - `TrackInstance` is shared across every listener of a theme. Its
//!   settings are the only mutable state, behind an `RwLock`, read as a
//!   snapshot once per mixdown tick.
//! - Scheduler state (decoder position, cadence) is per-listener and never
//!   lives here.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

use sonocodec::Container;

use crate::{
    error::ThemeError,
    metadata::ThemeMetadata,
    settings::{TrackPatch, TrackSettings},
};

/// One audio file of a theme. Created at scan, destroyed at rescan.
#[derive(Clone, Debug)]
pub struct Recording {
    path: PathBuf,
    file_name: String,
    container: Container,
    duration_secs: f64,
    total_frames: Option<u64>,
}

impl Recording {
    pub fn new(
        path: PathBuf,
        container: Container,
        duration_secs: f64,
        total_frames: Option<u64>,
    ) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            container,
            duration_secs,
            total_frames,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name within the theme folder; the key used by metadata.json.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// Natural duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }
}

impl PartialEq for Recording {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Recording {}

/// A (Recording, TrackSettings) pairing within one theme, shared across
/// listeners. `enabled` is runtime state and is not persisted.
#[derive(Debug)]
pub struct TrackInstance {
    recording: Recording,
    settings: RwLock<TrackSettings>,
    enabled: AtomicBool,
}

impl TrackInstance {
    pub fn new(recording: Recording, settings: TrackSettings) -> Self {
        Self {
            recording,
            settings: RwLock::new(settings),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Snapshot of the current settings. One snapshot per tick guarantees a
    /// scheduler never sees a torn update.
    pub fn settings(&self) -> TrackSettings {
        self.settings.read().expect("settings lock poisoned").clone()
    }

    pub fn apply_patch(&self, patch: &TrackPatch) -> TrackSettings {
        let mut settings = self.settings.write().expect("settings lock poisoned");
        patch.apply(&mut settings);
        if let Some(enabled) = patch.enabled {
            self.enabled.store(enabled, Ordering::Release);
        }
        settings.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// A theme as resolved from one folder scan: identity, track list and the
/// theme-wide knobs. Live streams pin an `Arc<ThemeDefinition>`, so a theme
/// removed by rescan keeps playing for already-connected listeners.
#[derive(Debug)]
pub struct ThemeDefinition {
    /// Sanitized route id derived from the display name.
    id: String,
    /// Persistent UUID from metadata.json.
    uuid: String,
    name: String,
    folder: PathBuf,
    tracks: Vec<Arc<TrackInstance>>,
    master_gain: RwLock<f64>,
    short_file_threshold: f64,
    /// The loaded metadata, retained so write-back preserves every field we
    /// do not own (description, presets, unknown keys, ...).
    meta: RwLock<ThemeMetadata>,
}

impl ThemeDefinition {
    pub fn new(
        id: String,
        name: String,
        folder: PathBuf,
        tracks: Vec<Arc<TrackInstance>>,
        meta: ThemeMetadata,
    ) -> Self {
        Self {
            id,
            uuid: meta.id.clone(),
            name,
            folder,
            tracks,
            master_gain: RwLock::new(meta.master_gain),
            short_file_threshold: meta.short_file_threshold,
            meta: RwLock::new(meta),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn tracks(&self) -> &[Arc<TrackInstance>] {
        &self.tracks
    }

    /// Looks up a track by its file name.
    pub fn track(&self, file_name: &str) -> Result<Arc<TrackInstance>, ThemeError> {
        self.tracks
            .iter()
            .find(|t| t.recording().file_name() == file_name)
            .cloned()
            .ok_or_else(|| ThemeError::TrackNotFound(file_name.to_string()))
    }

    pub fn master_gain(&self) -> f64 {
        *self.master_gain.read().expect("gain lock poisoned")
    }

    pub fn set_master_gain(&self, gain: f64) -> Result<(), ThemeError> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(ThemeError::Invalid(format!(
                "master_gain must be a finite value >= 0, got {}",
                gain
            )));
        }
        *self.master_gain.write().expect("gain lock poisoned") = gain;
        Ok(())
    }

    pub fn short_file_threshold(&self) -> f64 {
        self.short_file_threshold
    }

    /// Builds the metadata to persist: the retained file contents with the
    /// live settings and gain folded in.
    pub fn to_metadata(&self) -> ThemeMetadata {
        let mut meta = self.meta.read().expect("meta lock poisoned").clone();
        meta.master_gain = self.master_gain();
        for track in &self.tracks {
            meta.tracks
                .insert(track.recording().file_name().to_string(), track.settings());
        }
        meta
    }
}
