//! Defines the HTTP surface of the player backend.
//!
//! ## Structure
//! - **Public endpoints**
//!   - `GET /`        - plain-text banner
//!   - `GET /healthz` - liveness probe
//!
//! - **Authenticated endpoints** (Firebase bearer token, see `require_auth`)
//!   - `GET /api/protected`                 - echo the verified user
//!   - `GET /api/music/files`               - list audio files in Drive
//!   - `GET /api/music/stream/{file_id}`    - relay a file's bytes
//!
//! The music endpoints also need `x-google-access-token`.

use crate::{
    handlers::{
        auth_handlers::protected,
        health_handlers::{healthz, root},
        music_handlers::{list_files, stream_file},
    },
    middleware::auth::require_auth,
    state::AppState,
};
use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the full application router around `state`.
///
/// Everything nested under `/api` passes through the bearer-token gate
/// before reaching its handler.
pub fn routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/protected", get(protected))
        .route("/music/files", get(list_files))
        .route("/music/stream/{file_id}", get(stream_file))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
