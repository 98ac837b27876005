//! Liveness handlers. Neither touches authentication or Google.
//!
//! - GET /         -> plain-text banner
//! - GET /healthz  -> simple liveness ("ok")

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

pub const BANNER: &str = "Drive Player Backend is running! (Unprotected)";

/// `GET /`
pub async fn root() -> &'static str {
    BANNER
}

/// `GET /healthz`
///
/// Very small liveness probe; always returns 200 OK with a plain JSON body.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}
