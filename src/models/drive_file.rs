//! Google Drive file descriptors as returned by `files.list`.

use serde::{Deserialize, Serialize};

/// A file resource from the Drive v3 API.
///
/// Only the fields requested by the music listing are modelled. Fields the
/// API leaves out stay out of the serialized form, so the descriptor reaches
/// the client exactly as Drive produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Drive file ID.
    pub id: String,

    /// Display name, usually including the extension.
    pub name: String,

    /// MIME type reported by Drive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size in bytes. Drive encodes int64 values as strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,

    /// Parent folder IDs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

/// One page of a `files.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListPage {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Present while more pages remain.
    pub next_page_token: Option<String>,
}
