//! Command-line client for a running backend.
//!
//! Mirrors what the browser shell does: report whether the backend is up,
//! show who a token belongs to, list the user's music and pull a track
//! through the streaming endpoint.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use reqwest::{RequestBuilder, Response, header::AUTHORIZATION};
use std::{io, path::Path};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt},
};
use tokio_util::io::StreamReader;
use url::Url;

use crate::{
    config::{AppConfig, Command, Credentials},
    handlers::music_handlers::DRIVE_TOKEN_HEADER,
    models::{drive_file::DriveFile, user::ProtectedResponse},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error! Status: {status} {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Thin wrapper over the backend's HTTP API.
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
}

impl BackendClient {
    pub fn new(http: reqwest::Client, base: &str) -> ClientResult<Self> {
        Ok(Self {
            http,
            base: Url::parse(base)?,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        let request = request.header(AUTHORIZATION, format!("Bearer {}", credentials.id_token));
        match &credentials.drive_token {
            Some(token) => request.header(DRIVE_TOKEN_HEADER, token),
            None => request,
        }
    }

    /// `GET /`: the backend's banner text.
    pub async fn status(&self) -> ClientResult<String> {
        let response = ensure_success(self.http.get(self.base.clone()).send().await?).await?;
        Ok(response.text().await?)
    }

    pub async fn whoami(&self, credentials: &Credentials) -> ClientResult<ProtectedResponse> {
        let request = self.authorized(self.http.get(self.url(&["api", "protected"])), credentials);
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn list_files(&self, credentials: &Credentials) -> ClientResult<Vec<DriveFile>> {
        let request = self.authorized(
            self.http.get(self.url(&["api", "music", "files"])),
            credentials,
        );
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Copy a file's bytes from the streaming endpoint into `writer`,
    /// returning how many bytes were written.
    pub async fn fetch<W>(
        &self,
        credentials: &Credentials,
        file_id: &str,
        writer: &mut W,
    ) -> ClientResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let request = self.authorized(
            self.http.get(self.url(&["api", "music", "stream", file_id])),
            credentials,
        );
        let response = ensure_success(request.send().await?).await?;

        let stream = Box::pin(response.bytes_stream().map_err(io::Error::other));
        let mut reader = StreamReader::new(stream);
        let written = tokio::io::copy(&mut reader, writer).await?;
        writer.flush().await?;
        Ok(written)
    }
}

async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Run one of the client subcommands against `cfg.backend_url`.
pub async fn run(cfg: &AppConfig, command: Command, http: reqwest::Client) -> Result<()> {
    let client = BackendClient::new(http, &cfg.backend_url)
        .with_context(|| format!("backend URL `{}`", cfg.backend_url))?;

    match command {
        Command::Serve => anyhow::bail!("`serve` runs the backend, it is not a client command"),
        Command::Status => match client.status().await {
            Ok(message) => println!("Backend Connection: {}", message),
            Err(err) => {
                println!("Failed to connect to backend: {}", err);
                return Err(err.into());
            }
        },
        Command::Whoami(credentials) => {
            let me = client.whoami(&credentials).await?;
            println!("{}", me.message);
            println!("uid:   {}", me.user.uid);
            println!("email: {}", me.user.email.as_deref().unwrap_or("-"));
            println!("name:  {}", me.user.name);
        }
        Command::Files(credentials) => {
            let files = client.list_files(&credentials).await?;
            for file in &files {
                println!(
                    "{}\t{}\t{}\t{}",
                    file.id,
                    file.name,
                    file.mime_type.as_deref().unwrap_or("-"),
                    file.size.as_deref().unwrap_or("-")
                );
            }
            tracing::info!("{} files", files.len());
        }
        Command::Fetch {
            file_id,
            output,
            credentials,
        } => {
            let written = match output.as_deref() {
                Some(path) => {
                    let mut file = create_output(path).await?;
                    client.fetch(&credentials, &file_id, &mut file).await?
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    client.fetch(&credentials, &file_id, &mut stdout).await?
                }
            };
            tracing::info!("Fetched {} bytes of {}", written, file_id);
        }
    }

    Ok(())
}

async fn create_output(path: &Path) -> Result<File> {
    File::create(path)
        .await
        .with_context(|| format!("creating {}", path.display()))
}
