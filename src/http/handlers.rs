use super::state::AppState;
use crate::error::{CaptureError, ImportError, PlaybackError, UploadError};
use crate::session::{Channel, SessionSnapshot};
use crate::upload::ImportedAudio;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    /// Overrides the configured default when present
    pub convert_to_mp3: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn capture_error(e: CaptureError) -> Response {
    let status = match e {
        CaptureError::ChannelBusy { .. } | CaptureError::InvalidState { .. } | CaptureError::Cancelled { .. } => {
            StatusCode::CONFLICT
        }
        CaptureError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CaptureError::Device(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

fn playback_error(e: PlaybackError) -> Response {
    let status = match e {
        PlaybackError::NothingToPlay(_) => StatusCode::CONFLICT,
        PlaybackError::Failed(_) | PlaybackError::Revoked(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

fn upload_error(e: UploadError) -> Response {
    let status = match e {
        UploadError::NothingToUpload => StatusCode::BAD_REQUEST,
        UploadError::Rejected(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e)
}

fn import_error(e: ImportError) -> Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, e)
}

fn parse_channel(raw: &str) -> Result<Channel, Response> {
    raw.parse::<Channel>()
        .map_err(|e| error_response(StatusCode::NOT_FOUND, e))
}

async fn snapshot_response(state: &AppState, channel: Channel) -> Response {
    let snapshot: SessionSnapshot = state.recorder.session(channel).snapshot().await;
    (StatusCode::OK, Json(snapshot)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /recordings
pub async fn get_recorder(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.recorder.snapshot().await))
}

/// GET /recordings/:channel
pub async fn get_recording(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    match parse_channel(&channel) {
        Ok(channel) => snapshot_response(&state, channel).await,
        Err(response) => response,
    }
}

/// GET /recordings/:channel/artifact
/// Finished artifact bytes, served with their container type
pub async fn get_artifact(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let channel = match parse_channel(&channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    match state.recorder.session(channel).artifact().await {
        Some(artifact) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, artifact.mime_type().to_string())],
            artifact.payload().to_vec(),
        )
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No finished {} recording", channel),
        ),
    }
}

/// POST /recordings/:channel/start
pub async fn start_recording(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let channel = match parse_channel(&channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    info!("Starting {} recording", channel);
    match state.recorder.start(channel).await {
        Ok(()) => snapshot_response(&state, channel).await,
        Err(e) => {
            error!("Failed to start recording: {}", e);
            capture_error(e)
        }
    }
}

/// POST /recordings/:channel/pause
pub async fn pause_recording(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let channel = match parse_channel(&channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    match state.recorder.pause(channel).await {
        Ok(()) => snapshot_response(&state, channel).await,
        Err(e) => capture_error(e),
    }
}

/// POST /recordings/:channel/resume
pub async fn resume_recording(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let channel = match parse_channel(&channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    match state.recorder.resume(channel).await {
        Ok(()) => snapshot_response(&state, channel).await,
        Err(e) => capture_error(e),
    }
}

/// POST /recordings/:channel/stop
pub async fn stop_recording(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let channel = match parse_channel(&channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    info!("Stopping {} recording", channel);
    match state.recorder.stop(channel).await {
        Ok(()) => snapshot_response(&state, channel).await,
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            capture_error(e)
        }
    }
}

/// POST /recordings/:channel/clear
pub async fn clear_recording(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let channel = match parse_channel(&channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    match state.recorder.clear(channel).await {
        Ok(()) => snapshot_response(&state, channel).await,
        Err(e) => capture_error(e),
    }
}

/// POST /recordings/:channel/playback
/// Toggle preview playback of the finished artifact
pub async fn toggle_playback(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let channel = match parse_channel(&channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    match state.recorder.toggle_playback(channel).await {
        Ok(_) => snapshot_response(&state, channel).await,
        Err(e) => playback_error(e),
    }
}

/// POST /recordings/submit
/// Upload every finished recording; body `{ "convert_to_mp3": bool }` is optional
pub async fn submit_recordings(State(state): State<AppState>, body: Bytes) -> Response {
    let request: SubmitRequest = if body.is_empty() {
        SubmitRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid submit request: {}", e)),
        }
    };

    let convert = request.convert_to_mp3.unwrap_or(state.convert_to_mp3);
    match state.recorder.submit(state.uploader.as_ref(), convert).await {
        Ok(receipt) => {
            for notice in &receipt.notices {
                warn!("{}", notice);
            }
            (StatusCode::OK, Json(receipt)).into_response()
        }
        Err(e) => upload_error(e),
    }
}

/// POST /imports?name=<file name>
/// Raw file body; the declared type comes from `Content-Type`
pub async fn select_import(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let file = match ImportedAudio::new(params.name, content_type, body.to_vec()) {
        Ok(file) => file,
        Err(e) => return import_error(e),
    };

    match state.recorder.select_import(file).await {
        Ok(()) => (StatusCode::OK, Json(state.recorder.snapshot().await)).into_response(),
        Err(e) => import_error(e),
    }
}

/// DELETE /imports
pub async fn clear_import(State(state): State<AppState>) -> Response {
    state.recorder.clear_import().await;
    (StatusCode::OK, Json(state.recorder.snapshot().await)).into_response()
}

/// POST /imports/submit
pub async fn submit_import(State(state): State<AppState>) -> Response {
    match state.recorder.submit_import(state.uploader.as_ref()).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => upload_error(e),
    }
}
