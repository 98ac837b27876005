use axum::{Extension, Json};

use crate::models::user::{AuthUser, ProtectedResponse};

/// `GET /api/protected`: echoes the verified caller back.
pub async fn protected(Extension(user): Extension<AuthUser>) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "You accessed a protected route!".into(),
        user: user.into(),
    })
}
