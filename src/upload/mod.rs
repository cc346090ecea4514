//! Sending a picture to remote file storage
//!
//! - [`UploadClient`]: the seam the workflow calls
//! - [`http::HttpUploadClient`]: multipart upload over HTTP

pub mod http;

pub use http::HttpUploadClient;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::capture::Picture;
use crate::error::UploadError;

/// Opaque identifier of a stored file, handed to registration exactly once
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the file endpoint reports back about a stored file
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: FileId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Stores a picture remotely.
///
/// Every call stores a new file and returns a new id; there is no dedup.
#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload(&self, picture: &Picture) -> Result<FileId, UploadError>;
}
