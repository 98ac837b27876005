//! Bearer-token gate for the `/api` routes.
//!
//! Every request must carry `Authorization: Bearer <Firebase ID token>`. The
//! verified identity is stored in the request extensions as an `AuthUser` for
//! handlers to pick up with `Extension<AuthUser>`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{errors::AppError, services::auth_service::AuthError, state::AppState};

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;

    let user = state.verifier.verify(token).await.map_err(|err| {
        warn!("Error verifying Firebase ID token: {}", err);
        AppError::from(err)
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// The token part of a well-formed `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}
