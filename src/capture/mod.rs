//! Capture module for producing the still that starts a workflow
//!
//! This module defines the [`CaptureProvider`] seam and the [`Picture`] value
//! that flows through the rest of the pipeline. Two providers are available:
//! a file-backed one and, with the `screen` feature, a primary-monitor grab
//! through xcap.

pub mod file;
#[cfg(feature = "screen")]
pub mod screen;

pub use file::FileCapture;
#[cfg(feature = "screen")]
pub use screen::ScreenCapture;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CaptureError;

/// Format and dimensions of a picture, passed through untouched
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PictureMetadata {
    pub format: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// A captured or composed image
///
/// Pictures are never changed in place. Composing props onto one produces a
/// new `Picture` pointing at a new file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Picture {
    pub path: PathBuf,
    pub metadata: Option<PictureMetadata>,
}

impl Picture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: PictureMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used when sending the picture over the wire
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "picture.jpg".to_string())
    }
}

/// Anything that can take a still photograph
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn capture(&self) -> Result<Picture, CaptureError>;
}
