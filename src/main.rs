use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod client;
mod config;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use config::{AppConfig, Command};
use services::{
    auth_service::{FirebaseTokenVerifier, ServiceAccount},
    drive_service::GoogleDriveService,
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup (stderr, so `fetch` can stream to stdout) ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .user_agent(concat!("drive-player/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    match command {
        Command::Serve => serve(cfg, http).await,
        other => client::run(&cfg, other, http).await,
    }
}

async fn serve(cfg: AppConfig, http: reqwest::Client) -> Result<()> {
    tracing::info!("Starting drive-player with config: {:?}", cfg);

    // --- Identity verification ---
    let project_id = match cfg.project_id.clone() {
        Some(project_id) => project_id,
        None => ServiceAccount::from_file(&cfg.service_account_path)?.project_id,
    };
    let verifier = FirebaseTokenVerifier::new(http.clone(), project_id, cfg.jwks_url.clone());
    tracing::info!(
        "Firebase token verification ready for project {}",
        verifier.project_id()
    );

    // --- Drive access ---
    let drive = GoogleDriveService::new(http, &cfg.drive_api_base)
        .with_context(|| format!("Drive API base `{}`", cfg.drive_api_base))?;

    // --- Build router ---
    let state = AppState::new(Arc::new(verifier), Arc::new(drive));
    let app: Router = routes::routes::routes(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
