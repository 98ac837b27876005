//! src/services/drive_service.rs
//!
//! Google Drive v3 access on behalf of the signed-in user. The caller's own
//! OAuth access token is forwarded as the bearer credential; this service
//! never holds long-lived Drive credentials of its own.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{
    Response, StatusCode,
    header::{CONTENT_RANGE, RANGE},
};
use std::pin::Pin;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::drive_file::{DriveFile, FileListPage};

/// Google Drive API base URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Audio by MIME type, plus common extensions Drive does not always type.
pub const MUSIC_QUERY: &str = "mimeType contains 'audio/' or name contains '.mp3' or name contains '.flac' or name contains '.wav' or name contains '.ogg'";

const LIST_FIELDS: &str =
    "nextPageToken, files(id, name, mimeType, size, webContentLink, webViewLink, parents)";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Google Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid Drive API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

pub type DriveResult<T> = Result<T, DriveError>;

pub type ByteStream = Pin<Box<dyn Stream<Item = DriveResult<Bytes>> + Send>>;

/// An open `alt=media` download.
///
/// Dropping it (or its `body`) closes the upstream connection.
pub struct DriveStream {
    /// Upstream answered 206 to a ranged request.
    pub partial: bool,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub body: ByteStream,
}

/// File listing and streaming, with the user's Drive token passed per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// All audio files visible to the token, every page concatenated in order.
    async fn list_music_files(&self, access_token: &str) -> DriveResult<Vec<DriveFile>>;

    /// Open the content of `file_id`, optionally for a byte `range`.
    async fn open_file_stream(
        &self,
        access_token: &str,
        file_id: &str,
        range: Option<String>,
    ) -> DriveResult<DriveStream>;
}

/// `DriveClient` backed by the Drive v3 REST API.
pub struct GoogleDriveService {
    http: reqwest::Client,
    api_base: Url,
}

impl GoogleDriveService {
    pub fn new(http: reqwest::Client, api_base: &str) -> DriveResult<Self> {
        Ok(Self {
            http,
            api_base: Url::parse(api_base)?,
        })
    }

    /// `api_base` with `segments` appended as escaped path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn list_page(
        &self,
        access_token: &str,
        page_token: Option<&str>,
    ) -> DriveResult<FileListPage> {
        let mut query = vec![
            ("q", MUSIC_QUERY),
            ("fields", LIST_FIELDS),
            ("spaces", "drive"),
            ("pageSize", PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http
            .get(self.endpoint(&["files"]))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<FileListPage>().await?)
    }
}

#[async_trait]
impl DriveClient for GoogleDriveService {
    async fn list_music_files(&self, access_token: &str) -> DriveResult<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let page = self
                .list_page(access_token, next_page_token.as_deref())
                .await?;
            debug!("Drive returned {} files in page", page.files.len());
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => next_page_token = Some(token),
                None => break,
            }
        }

        info!("Listed {} music files from Google Drive", files.len());
        Ok(files)
    }

    async fn open_file_stream(
        &self,
        access_token: &str,
        file_id: &str,
        range: Option<String>,
    ) -> DriveResult<DriveStream> {
        let mut request = self
            .http
            .get(self.endpoint(&["files", file_id]))
            .bearer_auth(access_token)
            .query(&[("alt", "media")]);
        if let Some(range) = range {
            request = request.header(RANGE, range);
        }

        let response = ensure_success(request.send().await?).await?;
        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(DriveStream {
            partial: response.status() == StatusCode::PARTIAL_CONTENT,
            content_length: response.content_length(),
            content_range,
            body: Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(DriveError::from))),
        })
    }
}

/// Turn a non-2xx Drive response into `DriveError::Api`, keeping its body
/// as the message.
async fn ensure_success(response: Response) -> DriveResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    warn!("Google Drive request failed: status={}", status);
    Err(DriveError::Api {
        status: status.as_u16(),
        message,
    })
}
