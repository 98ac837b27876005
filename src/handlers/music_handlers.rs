//! HTTP handlers for the music library.
//!
//! Both routes sit behind `require_auth` and additionally need the caller's
//! Google access token in `x-google-access-token`, which is forwarded to
//! Drive as-is. File bodies are relayed chunk by chunk without buffering.

use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    response::Response,
};
use futures::StreamExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::drive_file::DriveFile,
    services::drive_service::{ByteStream, DriveStream},
    state::AppState,
};

pub const DRIVE_TOKEN_HEADER: &str = "x-google-access-token";

/// The caller's Google access token, required on every music route.
pub struct DriveToken(pub String);

impl<S> FromRequestParts<S> for DriveToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(DRIVE_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| DriveToken(v.to_string()))
            .ok_or_else(|| AppError::bad_request("Bad Request: Google Access Token required."))
    }
}

/// `GET /api/music/files`
pub async fn list_files(
    State(state): State<AppState>,
    DriveToken(token): DriveToken,
) -> Result<Json<Vec<DriveFile>>, AppError> {
    let files = state.drive.list_music_files(&token).await.map_err(|err| {
        error!("Error listing music files from Google Drive: {}", err);
        AppError::internal("Internal Server Error: Could not list files.")
    })?;

    Ok(Json(files))
}

/// `GET /api/music/stream/{file_id}`
///
/// Headers are fixed before the first body byte. An upstream failure after
/// that point surfaces as a body error, which aborts the connection instead
/// of producing a second status line.
pub async fn stream_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    DriveToken(token): DriveToken,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let upstream = state
        .drive
        .open_file_stream(&token, &file_id, range)
        .await
        .map_err(|err| {
            error!("Error streaming file {} from Google Drive: {}", file_id, err);
            AppError::internal("Internal Server Error: Could not stream file.")
        })?;

    let DriveStream {
        partial,
        content_length,
        content_range,
        body,
    } = upstream;

    let mut response = Response::new(Body::from_stream(relay(body, file_id)));
    *response.status_mut() = if partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let out = response.headers_mut();
    out.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(length) = content_length {
        out.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(value) = content_range.and_then(|r| HeaderValue::from_str(&r).ok()) {
        out.insert(header::CONTENT_RANGE, value);
    }

    Ok(response)
}

/// Logs a relayed stream once it is dropped, whichever way it ended.
struct RelayLog {
    stream_id: Uuid,
    file_id: String,
    bytes: u64,
    failed: bool,
}

impl Drop for RelayLog {
    fn drop(&mut self) {
        if !self.failed {
            info!(
                stream_id = %self.stream_id,
                "Stream for fileId {} ended after {} bytes",
                self.file_id,
                self.bytes
            );
        }
    }
}

fn relay(body: ByteStream, file_id: String) -> ByteStream {
    let stream_id = Uuid::new_v4();
    info!(stream_id = %stream_id, "Streaming fileId {}", file_id);

    let mut log = RelayLog {
        stream_id,
        file_id,
        bytes: 0,
        failed: false,
    };
    Box::pin(body.map(move |chunk| {
        match &chunk {
            Ok(bytes) => log.bytes += bytes.len() as u64,
            Err(err) => {
                log.failed = true;
                warn!(
                    stream_id = %log.stream_id,
                    "Stream error for fileId {} after {} bytes: {}",
                    log.file_id,
                    log.bytes,
                    err
                );
            }
        }
        chunk
    }))
}
