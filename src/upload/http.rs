use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::ImageFormat;
use log::{debug, info};
use reqwest::multipart::{Form, Part};

use super::{FileId, UploadClient, UploadedFile};
use crate::capture::Picture;
use crate::error::UploadError;

/// Name of the multipart field carrying the file
const FILE_FIELD: &str = "data";

#[derive(Clone, Debug)]
pub struct HttpUploadClient {
    client: reqwest::Client,
    endpoint: String,
    max_bytes: u64,
}

impl HttpUploadClient {
    pub fn new(
        endpoint: impl Into<String>,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("propcam/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_bytes,
        })
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn upload(&self, picture: &Picture) -> Result<FileId, UploadError> {
        let path = picture.path();
        let io_error = |source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(io_error)?.len();
        check_size(size, self.max_bytes)?;

        let bytes = tokio::fs::read(path).await.map_err(io_error)?;
        let part = Part::bytes(bytes)
            .file_name(picture.file_name())
            .mime_str(mime_for(path))?;
        let form = Form::new().part(FILE_FIELD, part);

        debug!("Uploading {:?} ({} bytes) to {}", path, size, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded = parse_upload_response(&body)?;
        info!(
            "Uploaded {:?} as file {} ({})",
            path,
            uploaded.id,
            uploaded.url.as_deref().unwrap_or("no url")
        );
        Ok(uploaded.id)
    }
}

pub fn check_size(size: u64, limit: u64) -> Result<(), UploadError> {
    if size > limit {
        return Err(UploadError::TooLarge { size, limit });
    }
    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Decode the file endpoint's JSON reply
pub fn parse_upload_response(body: &str) -> Result<UploadedFile, UploadError> {
    let uploaded: UploadedFile = serde_json::from_str(body)
        .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

    if uploaded.id.as_str().is_empty() {
        return Err(UploadError::InvalidResponse(
            "response carried an empty file id".to_string(),
        ));
    }
    Ok(uploaded)
}
