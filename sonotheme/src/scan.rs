//! Theme discovery: walks the audio root and turns each folder holding at
//! least one decodable audio file into a `ThemeDefinition`.

use std::{
    collections::HashMap,
    path::Path,
    sync::Arc,
};

use sonocodec::{probe, CodecError, Container};
use sonoutils::sanitize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::ThemeError,
    metadata::ThemeMetadata,
    model::{Recording, ThemeDefinition, TrackInstance},
};

/// Scans `root` and builds the id → theme map.
///
/// The root is created when missing. Folders without supported audio are
/// skipped; individual files that fail probing are excluded from their theme
/// with a warning, never failing the scan.
pub fn scan_themes(root: &Path) -> Result<HashMap<String, Arc<ThemeDefinition>>, ThemeError> {
    if !root.exists() {
        info!(root = %root.display(), "Audio root missing, creating it");
        std::fs::create_dir_all(root)?;
    }

    let mut themes: HashMap<String, Arc<ThemeDefinition>> = HashMap::new();

    let mut folders: Vec<_> = std::fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();

    for folder in folders {
        match scan_folder(&folder, &themes) {
            Ok(Some((id, theme))) => {
                themes.insert(id, theme);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(folder = %folder.display(), error = %err, "Skipping theme folder");
            }
        }
    }

    info!(count = themes.len(), "Theme scan complete");
    Ok(themes)
}

fn scan_folder(
    folder: &Path,
    existing: &HashMap<String, Arc<ThemeDefinition>>,
) -> Result<Option<(String, Arc<ThemeDefinition>)>, ThemeError> {
    let mut audio_files: Vec<_> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(Container::from_extension)
                    .is_some()
        })
        .collect();
    audio_files.sort();

    if audio_files.is_empty() {
        return Ok(None);
    }

    let mut metadata = load_or_create_metadata(folder)?;

    let mut tracks = Vec::new();
    for path in audio_files {
        match probe(&path) {
            Ok(probed) => {
                let recording = Recording::new(
                    path,
                    probed.container,
                    probed.duration_secs,
                    probed.spec.total_frames,
                );
                let settings = metadata.track_settings(recording.file_name());
                tracks.push(Arc::new(TrackInstance::new(recording, settings)));
            }
            Err(CodecError::Unsupported(_)) => {
                warn!(file = %path.display(), "Unsupported container, excluding from theme");
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Unreadable audio file, excluding from theme");
            }
        }
    }

    if tracks.is_empty() {
        return Ok(None);
    }

    let name = metadata.name.clone();
    // Two folders can sanitize to the same id; suffix to keep both routable.
    let base_id = sanitize(&name);
    let mut id = base_id.clone();
    let mut suffix = 2;
    while existing.contains_key(&id) {
        id = format!("{}_{}", base_id, suffix);
        suffix += 1;
    }
    info!(
        theme = %name,
        id = %id,
        tracks = tracks.len(),
        "Loaded theme"
    );

    // Drop settings for files that no longer exist; they would otherwise
    // accumulate forever in metadata.json.
    let live: std::collections::HashSet<String> = tracks
        .iter()
        .map(|t| t.recording().file_name().to_string())
        .collect();
    metadata.tracks.retain(|name, _| live.contains(name));

    let theme = ThemeDefinition::new(id.clone(), name, folder.to_path_buf(), tracks, metadata);
    Ok(Some((id, Arc::new(theme))))
}

/// Loads metadata.json, creating (and immediately persisting) defaults when
/// it is absent or unreadable. The persistent UUID and display name are
/// filled in and written back so identity survives folder renames.
fn load_or_create_metadata(folder: &Path) -> Result<ThemeMetadata, ThemeError> {
    let folder_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "theme".to_string());

    let mut metadata = match ThemeMetadata::load(folder) {
        Ok(meta) => meta,
        Err(ThemeError::Io(_)) => ThemeMetadata::default(),
        Err(err) => {
            warn!(folder = %folder.display(), error = %err, "Corrupt metadata.json, recreating defaults");
            ThemeMetadata::default()
        }
    };

    let mut changed = false;
    if metadata.id.is_empty() {
        metadata.id = Uuid::new_v4().to_string();
        changed = true;
    }
    if metadata.name.is_empty() {
        metadata.name = folder_name;
        changed = true;
    }

    if changed {
        if let Err(err) = metadata.save(folder) {
            warn!(folder = %folder.display(), error = %err, "Could not persist metadata.json");
        }
    }

    Ok(metadata)
}
