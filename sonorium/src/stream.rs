//! The stream endpoint: `GET /stream/{theme_id}` → infinite paced MP3.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use futures_util::StreamExt;
use tracing::info;

use crate::{api::ApiError, state::AppState};

/// GET /stream/{theme_id}
///
/// `200 OK`, `audio/mpeg`, chunked, infinite body of MP3 frames paced at
/// wall-clock audio rate. No range support — this is a radio, not a file.
async fn stream_theme(
    State(state): State<AppState>,
    Path(theme_id): Path<String>,
) -> Result<Response, ApiError> {
    let theme = state.registry.get(&theme_id)?;
    let stream = state.manager.attach(theme.clone())?;

    info!(
        theme = theme.id(),
        listener_id = stream.listener_id(),
        "Streaming to new listener"
    );

    let body = Body::from_stream(stream.map(Ok::<_, std::convert::Infallible>));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(header::ACCEPT_RANGES, "none")
        .header(header::CACHE_CONTROL, "no-cache, no-store")
        .body(body)
        .map_err(|err| ApiError::internal(format!("response build failed: {}", err)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stream/{theme_id}", get(stream_theme))
        .with_state(state)
}
