use std::sync::Arc;

use crate::services::{auth_service::TokenVerifier, drive_service::DriveClient};

/// Shared handler state. Both collaborators sit behind traits so the router
/// can run against the real Google services or against test doubles.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub drive: Arc<dyn DriveClient>,
}

impl AppState {
    pub fn new(verifier: Arc<dyn TokenVerifier>, drive: Arc<dyn DriveClient>) -> Self {
        Self { verifier, drive }
    }
}
