//! The authenticated caller and the `/api/protected` payload.

use serde::{Deserialize, Serialize};

/// Identity extracted from a verified Firebase ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Firebase uid (the token's `sub`).
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtectedResponse {
    pub message: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub name: String,
}

impl From<AuthUser> for UserSummary {
    fn from(user: AuthUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            name: user
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "N/A".into()),
        }
    }
}
