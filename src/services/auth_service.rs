//! src/services/auth_service.rs
//!
//! Firebase ID token verification. Tokens are RS256 JWTs signed by Google's
//! `securetoken` service account; the public keys are fetched from the JWK
//! endpoint and cached for as long as its `Cache-Control: max-age` allows.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use reqwest::header::{CACHE_CONTROL, HeaderMap};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::user::AuthUser;

/// Public keys for Firebase ID tokens, in JWK form.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const DEFAULT_KEY_TTL_SECS: i64 = 3600;
const MAX_KEY_TTL_SECS: i64 = 86_400;
/// Minimum age of the key set before an unknown `kid` may trigger a refetch.
const MIN_REFRESH_SECS: i64 = 60;
const CLOCK_SKEW_SECS: i64 = 60;
const MAX_UID_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer token provided")]
    MissingToken,
    #[error("ID token has expired")]
    Expired,
    #[error("invalid ID token: {0}")]
    InvalidToken(String),
    #[error("signing key `{0}` not found")]
    UnknownKey(String),
    #[error("could not fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),
    #[error("service account `{path}` unusable: {reason}")]
    ServiceAccount { path: String, reason: String },
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(err.to_string()),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Verifies bearer credentials presented to the `/api` routes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> AuthResult<AuthUser>;
}

/// The parts of a Firebase service-account file needed for verification.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
}

impl ServiceAccount {
    pub fn from_file(path: &Path) -> AuthResult<Self> {
        let unusable = |reason: String| AuthError::ServiceAccount {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| unusable(e.to_string()))?;
        let account: ServiceAccount =
            serde_json::from_str(&raw).map_err(|e| unusable(e.to_string()))?;
        if account.project_id.is_empty() {
            return Err(unusable("project_id is empty".into()));
        }
        Ok(account)
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    iat: i64,
    #[serde(default)]
    auth_time: Option<i64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl CachedKeys {
    /// Answer for `kid` from the cached set, or `None` when a refetch is due.
    fn lookup(&self, kid: &str, now: DateTime<Utc>) -> Option<AuthResult<DecodingKey>> {
        if self.expires_at <= now {
            return None;
        }
        match self.keys.find(kid) {
            Some(jwk) => Some(DecodingKey::from_jwk(jwk).map_err(AuthError::from)),
            None if now - self.fetched_at < Duration::seconds(MIN_REFRESH_SECS) => {
                Some(Err(AuthError::UnknownKey(kid.to_string())))
            }
            None => None,
        }
    }
}

/// Checks Firebase ID tokens against Google's published signing keys.
pub struct FirebaseTokenVerifier {
    http: reqwest::Client,
    project_id: String,
    jwks_url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(
        http: reqwest::Client,
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_SECS as u64;
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("{}{}", ISSUER_PREFIX, self.project_id)]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }

    /// Resolve the decoding key for `kid`.
    ///
    /// The key set is refetched when it has expired, or when it does not know
    /// `kid` and is at least `MIN_REFRESH_SECS` old. Concurrent misses wait on
    /// the write lock and share a single fetch.
    async fn decoding_key(&self, kid: &str) -> AuthResult<DecodingKey> {
        if let Some(found) = self
            .cache
            .read()
            .await
            .as_ref()
            .and_then(|cached| cached.lookup(kid, Utc::now()))
        {
            return found;
        }

        let mut guard = self.cache.write().await;
        if let Some(found) = guard
            .as_ref()
            .and_then(|cached| cached.lookup(kid, Utc::now()))
        {
            return found;
        }

        let fetched = self.fetch_keys().await?;
        let key = match fetched.keys.find(kid) {
            Some(jwk) => DecodingKey::from_jwk(jwk).map_err(AuthError::from),
            None => Err(AuthError::UnknownKey(kid.to_string())),
        };
        *guard = Some(fetched);
        key
    }

    async fn fetch_keys(&self) -> AuthResult<CachedKeys> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?;
        let ttl = key_ttl_secs(response.headers());
        let keys: JwkSet = response.json().await?;
        info!(
            "Fetched {} Firebase signing keys (valid for {}s)",
            keys.keys.len(),
            ttl
        );

        let fetched_at = Utc::now();
        Ok(CachedKeys {
            keys,
            fetched_at,
            expires_at: fetched_at + Duration::seconds(ttl),
        })
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, id_token: &str) -> AuthResult<AuthUser> {
        let header = decode_header(id_token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing `kid` header".into()))?;

        let key = self.decoding_key(&kid).await?;
        let claims = decode::<FirebaseClaims>(id_token, &key, &self.validation())?.claims;

        let now = Utc::now().timestamp();
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(AuthError::InvalidToken("`sub` must be 1-128 characters".into()));
        }
        if claims.iat > now + CLOCK_SKEW_SECS {
            return Err(AuthError::InvalidToken("issued in the future".into()));
        }
        if claims.auth_time.is_some_and(|t| t > now + CLOCK_SKEW_SECS) {
            return Err(AuthError::InvalidToken("authenticated in the future".into()));
        }

        debug!(uid = %claims.sub, "verified Firebase ID token");
        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }
}

/// How long a fetched key set stays valid, bounded to one day.
fn key_ttl_secs(headers: &HeaderMap) -> i64 {
    max_age(headers)
        .unwrap_or(DEFAULT_KEY_TTL_SECS)
        .clamp(0, MAX_KEY_TTL_SECS)
}

/// Extract `max-age` seconds from a `Cache-Control` header.
fn max_age(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<i64>().ok())
}
