//! Capture from a still that already exists on disk
//!
//! Used when the photograph comes from somewhere other than a live device,
//! such as a camera roll export or a picture passed on the command line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageReader;
use log::{debug, info};

use super::{CaptureProvider, Picture, PictureMetadata};
use crate::error::CaptureError;

#[derive(Clone, Debug)]
pub struct FileCapture {
    source: PathBuf,
}

impl FileCapture {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl CaptureProvider for FileCapture {
    async fn capture(&self) -> Result<Picture, CaptureError> {
        let source = self.source.clone();
        debug!("Capturing still from {:?}", source);

        let metadata = tokio::task::spawn_blocking(move || read_metadata(&source)).await??;

        info!(
            "Captured {}x{} still from {:?}",
            metadata.width, metadata.height, self.source
        );
        Ok(Picture::new(self.source.clone()).with_metadata(metadata))
    }
}

/// Probe the file header for format and dimensions without decoding pixels
pub(crate) fn read_metadata(path: &Path) -> Result<PictureMetadata, CaptureError> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let format = reader
        .format()
        .and_then(|format| format.extensions_str().first())
        .map(|ext| ext.to_string());
    let (width, height) = reader.into_dimensions()?;

    Ok(PictureMetadata {
        format,
        width,
        height,
    })
}
