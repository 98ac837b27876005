use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{env, path::PathBuf};

use crate::services::{auth_service::FIREBASE_JWKS_URL, drive_service::DRIVE_API_BASE};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub service_account_path: PathBuf,
    pub project_id: Option<String>,
    pub drive_api_base: String,
    pub jwks_url: String,
    pub backend_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Google Drive music player backend")]
pub struct Args {
    /// Host to bind to (overrides DRIVE_PLAYER_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Firebase service-account JSON file (overrides FIREBASE_SERVICE_ACCOUNT)
    #[arg(long, global = true)]
    pub service_account: Option<PathBuf>,

    /// Firebase project id; defaults to the service account's project
    #[arg(long, global = true)]
    pub project_id: Option<String>,

    /// Google Drive API base URL (overrides DRIVE_API_BASE)
    #[arg(long, global = true)]
    pub drive_api_base: Option<String>,

    /// Firebase ID token signing keys (overrides FIREBASE_JWKS_URL)
    #[arg(long, global = true)]
    pub jwks_url: Option<String>,

    /// Backend used by the client commands (overrides DRIVE_PLAYER_BACKEND_URL)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP backend (default)
    Serve,
    /// Check that the backend is reachable
    Status,
    /// Show the user behind an ID token
    Whoami(Credentials),
    /// List music files in the user's Drive
    Files(Credentials),
    /// Stream a file through the backend to disk or stdout
    Fetch {
        file_id: String,

        /// Write to this path instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        credentials: Credentials,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct Credentials {
    /// Firebase ID token sent as the bearer credential
    #[arg(long, env = "DRIVE_PLAYER_ID_TOKEN", hide_env_values = true)]
    pub id_token: String,

    /// Google access token forwarded to Drive
    #[arg(long, env = "DRIVE_PLAYER_DRIVE_TOKEN", hide_env_values = true)]
    pub drive_token: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        let args = Args::parse();
        Self::from_parts(args, |key| env::var(key))
    }

    fn from_parts<F>(args: Args, var: F) -> Result<(Self, Command)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = var("DRIVE_PLAYER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading PORT"),
        };
        let env_service_account = var("FIREBASE_SERVICE_ACCOUNT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./firebase-admin-sdk.json"));
        let env_project = var("FIREBASE_PROJECT_ID").ok().filter(|p| !p.is_empty());
        let env_drive = var("DRIVE_API_BASE").unwrap_or_else(|_| DRIVE_API_BASE.into());
        let env_jwks = var("FIREBASE_JWKS_URL").unwrap_or_else(|_| FIREBASE_JWKS_URL.into());
        let env_backend =
            var("DRIVE_PLAYER_BACKEND_URL").unwrap_or_else(|_| "http://localhost:3000".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            service_account_path: args.service_account.unwrap_or(env_service_account),
            project_id: args.project_id.or(env_project),
            drive_api_base: args.drive_api_base.unwrap_or(env_drive),
            jwks_url: args.jwks_url.unwrap_or(env_jwks),
            backend_url: args.backend_url.unwrap_or(env_backend),
        };

        Ok((cfg, args.command.unwrap_or(Command::Serve)))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
