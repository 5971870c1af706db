//! Control-plane REST API.
//!
//! Mutations bind at the next mixdown tick of every live listener (volume,
//! mute, enable, master gain) or at the next scheduler transition (playback
//! mode, seamless loop). Every successful mutation marks the theme dirty
//! for the debounced metadata saver.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sonotheme::{PlaybackMode, ThemeDefinition, ThemeError, TrackInstance, TrackPatch};
use tracing::info;

use crate::state::AppState;

/// One theme in the listing.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ThemeSummary {
    /// Route id used in /stream/{id}
    pub id: String,
    /// Persistent UUID from metadata.json
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub is_favorite: bool,
    pub categories: Vec<String>,
    pub track_count: usize,
    /// Live listeners currently streaming this theme
    pub listeners: usize,
    /// Stream endpoint for media players
    pub stream_path: String,
}

/// Full view of one theme.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ThemeDetail {
    pub id: String,
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub master_gain: f64,
    pub short_file_threshold: f64,
    pub listeners: usize,
    pub tracks: Vec<TrackView>,
}

/// One track with its current settings.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TrackView {
    /// File name within the theme folder
    pub name: String,
    pub duration_secs: f64,
    pub enabled: bool,
    pub presence: f64,
    pub volume: f64,
    pub muted: bool,
    /// auto | continuous | sparse | presence
    pub playback_mode: String,
    pub seamless_loop: bool,
    pub exclusive: bool,
}

/// Partial track update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct TrackSettingsPatch {
    pub presence: Option<f64>,
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub enabled: Option<bool>,
    /// auto | continuous | sparse | presence
    pub playback_mode: Option<String>,
    pub seamless_loop: Option<bool>,
    pub exclusive: Option<bool>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MasterGainRequest {
    pub gain: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MasterGainResponse {
    pub id: String,
    pub master_gain: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RescanResponse {
    pub themes: usize,
}

/// API error rendered as `{"error": <kind>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "error": self.kind,
                "message": self.message,
            })),
        )
            .into_response()
    }
}

impl From<ThemeError> for ApiError {
    fn from(err: ThemeError) -> Self {
        let (status, kind) = match &err {
            ThemeError::NotFound(_) | ThemeError::TrackNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ThemeError::Invalid(_) => (StatusCode::BAD_REQUEST, "config_invalid"),
            ThemeError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            ThemeError::Metadata(_) => (StatusCode::INTERNAL_SERVER_ERROR, "metadata_error"),
        };
        Self {
            status,
            kind,
            message: err.to_string(),
        }
    }
}

impl From<sonoaudio::StreamError> for ApiError {
    fn from(err: sonoaudio::StreamError) -> Self {
        let (status, kind) = match &err {
            sonoaudio::StreamError::CapacityExhausted(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "capacity_exhausted")
            }
            sonoaudio::StreamError::Encoder(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encoder_error")
            }
        };
        Self {
            status,
            kind,
            message: err.to_string(),
        }
    }
}

fn mode_name(mode: PlaybackMode) -> &'static str {
    match mode {
        PlaybackMode::Auto => "auto",
        PlaybackMode::Continuous => "continuous",
        PlaybackMode::Sparse => "sparse",
        PlaybackMode::Presence => "presence",
    }
}

fn parse_mode(name: &str) -> Result<PlaybackMode, ApiError> {
    match name {
        "auto" => Ok(PlaybackMode::Auto),
        "continuous" => Ok(PlaybackMode::Continuous),
        "sparse" => Ok(PlaybackMode::Sparse),
        "presence" => Ok(PlaybackMode::Presence),
        other => Err(ThemeError::Invalid(format!("unknown playback_mode '{}'", other)).into()),
    }
}

impl TrackSettingsPatch {
    fn into_patch(self) -> Result<TrackPatch, ApiError> {
        let playback_mode = match self.playback_mode.as_deref() {
            Some(name) => Some(parse_mode(name)?),
            None => None,
        };
        let patch = TrackPatch {
            presence: self.presence,
            volume: self.volume,
            muted: self.muted,
            enabled: self.enabled,
            playback_mode,
            seamless_loop: self.seamless_loop,
            exclusive: self.exclusive,
        };
        patch.validate().map_err(ApiError::from)?;
        Ok(patch)
    }
}

fn track_view(track: &TrackInstance) -> TrackView {
    let settings = track.settings();
    TrackView {
        name: track.recording().file_name().to_string(),
        duration_secs: track.recording().duration_secs(),
        enabled: track.is_enabled(),
        presence: settings.presence,
        volume: settings.volume,
        muted: settings.muted,
        playback_mode: mode_name(settings.playback_mode).to_string(),
        seamless_loop: settings.seamless_loop,
        exclusive: settings.exclusive,
    }
}

fn theme_summary(state: &AppState, theme: &ThemeDefinition) -> ThemeSummary {
    let meta = theme.to_metadata();
    ThemeSummary {
        id: theme.id().to_string(),
        uuid: theme.uuid().to_string(),
        name: theme.name().to_string(),
        description: meta.description,
        icon: meta.icon,
        is_favorite: meta.is_favorite,
        categories: meta.categories,
        track_count: theme.tracks().len(),
        listeners: state.manager.active_for(theme.id()),
        stream_path: format!("/stream/{}", theme.id()),
    }
}

/// GET /api/themes - list all themes
#[utoipa::path(
    get,
    path = "/api/themes",
    tag = "themes",
    responses(
        (status = 200, description = "All known themes", body = [ThemeSummary])
    )
)]
async fn list_themes(State(state): State<AppState>) -> Json<Vec<ThemeSummary>> {
    let summaries = state
        .registry
        .list()
        .iter()
        .map(|theme| theme_summary(&state, theme))
        .collect();
    Json(summaries)
}

/// GET /api/themes/{id} - one theme with per-track settings
#[utoipa::path(
    get,
    path = "/api/themes/{id}",
    tag = "themes",
    params(
        ("id" = String, Path, description = "Theme id (sanitized name or UUID)")
    ),
    responses(
        (status = 200, description = "Theme detail", body = ThemeDetail),
        (status = 404, description = "Unknown theme")
    )
)]
async fn get_theme(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThemeDetail>, ApiError> {
    let theme = state.registry.get(&id)?;
    let meta = theme.to_metadata();
    Ok(Json(ThemeDetail {
        id: theme.id().to_string(),
        uuid: theme.uuid().to_string(),
        name: theme.name().to_string(),
        description: meta.description,
        master_gain: theme.master_gain(),
        short_file_threshold: theme.short_file_threshold(),
        listeners: state.manager.active_for(theme.id()),
        tracks: theme.tracks().iter().map(|t| track_view(t)).collect(),
    }))
}

/// POST /api/themes/{id}/tracks/{name} - patch one track's settings
#[utoipa::path(
    post,
    path = "/api/themes/{id}/tracks/{name}",
    tag = "themes",
    params(
        ("id" = String, Path, description = "Theme id"),
        ("name" = String, Path, description = "Track file name")
    ),
    request_body = TrackSettingsPatch,
    responses(
        (status = 200, description = "Updated track", body = TrackView),
        (status = 400, description = "Invalid setting"),
        (status = 404, description = "Unknown theme or track")
    )
)]
async fn update_track(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(body): Json<TrackSettingsPatch>,
) -> Result<Json<TrackView>, ApiError> {
    let patch = body.into_patch()?;
    let theme = state.registry.get(&id)?;
    state.registry.update_track(theme.id(), &name, &patch)?;
    state.saver.mark(theme.id());

    let track = theme.track(&name)?;
    Ok(Json(track_view(&track)))
}

/// POST /api/themes/{id}/master_gain - set the theme's output gain
#[utoipa::path(
    post,
    path = "/api/themes/{id}/master_gain",
    tag = "themes",
    params(
        ("id" = String, Path, description = "Theme id")
    ),
    request_body = MasterGainRequest,
    responses(
        (status = 200, description = "Gain applied", body = MasterGainResponse),
        (status = 400, description = "Invalid gain"),
        (status = 404, description = "Unknown theme")
    )
)]
async fn set_master_gain(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MasterGainRequest>,
) -> Result<Json<MasterGainResponse>, ApiError> {
    let theme = state.registry.get(&id)?;
    theme.set_master_gain(body.gain)?;
    state.saver.mark(theme.id());

    Ok(Json(MasterGainResponse {
        id: theme.id().to_string(),
        master_gain: theme.master_gain(),
    }))
}

/// POST /api/rescan - rebuild the theme catalogue from disk
#[utoipa::path(
    post,
    path = "/api/rescan",
    tag = "themes",
    responses(
        (status = 200, description = "Rescan complete", body = RescanResponse)
    )
)]
async fn rescan(State(state): State<AppState>) -> Result<Json<RescanResponse>, ApiError> {
    let registry = state.registry.clone();
    let themes = tokio::task::spawn_blocking(move || registry.rescan())
        .await
        .map_err(|err| ApiError::internal(format!("rescan task failed: {}", err)))??;

    info!(themes, "Rescan requested via API");
    Ok(Json(RescanResponse { themes }))
}

/// GET /api/openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(ApiDoc::openapi())
}

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(list_themes, get_theme, update_track, set_master_gain, rescan),
    components(schemas(
        ThemeSummary,
        ThemeDetail,
        TrackView,
        TrackSettingsPatch,
        MasterGainRequest,
        MasterGainResponse,
        RescanResponse
    )),
    tags(
        (name = "themes", description = "Theme and track control plane")
    )
)]
pub struct ApiDoc;

/// Builds the control-plane router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/themes", get(list_themes))
        .route("/api/themes/{id}", get(get_theme))
        .route("/api/themes/{id}/tracks/{name}", post(update_track))
        .route("/api/themes/{id}/master_gain", post(set_master_gain))
        .route("/api/rescan", post(rescan))
        .route("/api/openapi.json", get(openapi_json))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonoaudio::StreamManager;
    use sonotheme::{MetadataSaver, ThemeRegistry};
    use std::{io::Write, sync::Arc};

    fn write_wav(path: &std::path::Path, samples: &[i16]) {
        let mut file = std::fs::File::create(path).unwrap();
        let data_len = (samples.len() * 2) as u32;
        file.write_all(b"RIFF").unwrap();
        file.write_all(&(36 + data_len).to_le_bytes()).unwrap();
        file.write_all(b"WAVE").unwrap();
        file.write_all(b"fmt ").unwrap();
        file.write_all(&16u32.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&44_100u32.to_le_bytes()).unwrap();
        file.write_all(&88_200u32.to_le_bytes()).unwrap();
        file.write_all(&2u16.to_le_bytes()).unwrap();
        file.write_all(&16u16.to_le_bytes()).unwrap();
        file.write_all(b"data").unwrap();
        file.write_all(&data_len.to_le_bytes()).unwrap();
        for s in samples {
            file.write_all(&s.to_le_bytes()).unwrap();
        }
    }

    fn state_with_theme(root: &std::path::Path) -> AppState {
        let folder = root.join("Night Rain");
        std::fs::create_dir_all(&folder).unwrap();
        write_wav(&folder.join("rain.wav"), &vec![2000i16; 44_100]);

        let registry = Arc::new(ThemeRegistry::open(root.to_path_buf()).unwrap());
        let saver = MetadataSaver::spawn(registry.clone(), false);
        AppState {
            registry,
            manager: Arc::new(StreamManager::new(4)),
            saver,
        }
    }

    #[tokio::test]
    async fn listing_and_detail() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_theme(dir.path());

        let Json(themes) = list_themes(State(state.clone())).await;
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].id, "night_rain");
        assert_eq!(themes[0].stream_path, "/stream/night_rain");
        assert_eq!(themes[0].listeners, 0);

        let Json(detail) = get_theme(State(state), Path("night_rain".to_string()))
            .await
            .unwrap();
        assert_eq!(detail.tracks.len(), 1);
        assert_eq!(detail.tracks[0].name, "rain.wav");
        assert_eq!(detail.master_gain, 6.0);
    }

    #[tokio::test]
    async fn unknown_theme_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_theme(dir.path());

        let err = get_theme(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.kind, "not_found");
    }

    #[tokio::test]
    async fn track_patch_applies_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_theme(dir.path());

        let body = TrackSettingsPatch {
            volume: Some(0.5),
            playback_mode: Some("sparse".to_string()),
            ..Default::default()
        };
        let Json(view) = update_track(
            State(state.clone()),
            Path(("night_rain".to_string(), "rain.wav".to_string())),
            Json(body),
        )
        .await
        .unwrap();
        assert_eq!(view.volume, 0.5);
        assert_eq!(view.playback_mode, "sparse");

        // Out-of-range volume → 400 config_invalid
        let err = update_track(
            State(state.clone()),
            Path(("night_rain".to_string(), "rain.wav".to_string())),
            Json(TrackSettingsPatch {
                volume: Some(3.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "config_invalid");

        // Unknown mode name → 400
        let err = update_track(
            State(state),
            Path(("night_rain".to_string(), "rain.wav".to_string())),
            Json(TrackSettingsPatch {
                playback_mode: Some("shuffle".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn master_gain_roundtrip_and_rescan() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_theme(dir.path());

        let Json(resp) = set_master_gain(
            State(state.clone()),
            Path("night_rain".to_string()),
            Json(MasterGainRequest { gain: 2.0 }),
        )
        .await
        .unwrap();
        assert_eq!(resp.master_gain, 2.0);

        let err = set_master_gain(
            State(state.clone()),
            Path("night_rain".to_string()),
            Json(MasterGainRequest { gain: f64::NAN }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let Json(rescanned) = rescan(State(state)).await.unwrap();
        assert_eq!(rescanned.themes, 1);
    }
}
