//! Error types for the capture, compose, upload and registration pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::app::{Action, WorkflowPhase};

pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;

/// The capture device could not produce a still image.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no monitor available to capture")]
    NoMonitor,
    #[error("capture device failed: {0}")]
    Device(String),
    #[error("failed to read or write capture at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("captured image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("capture task was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Flattening the props onto the base picture failed.
///
/// Never surfaced to the user; the workflow falls back to the base picture.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("prop would be scaled to {width}x{height}, too large for the picture")]
    PropTooLarge { width: u64, height: u64 },
    #[error("failed to encode composite: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write composite: {0}")]
    Io(#[from] std::io::Error),
    #[error("composition task was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("picture is {size} bytes, the upload limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("registration rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("registration failed: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("invalid registration response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Errors returned by [`crate::app::WorkflowController`] operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("photo was uploaded but could not be saved: {0}")]
    Registration(#[from] RegistrationError),
    #[error("{} is not available while {phase}", .action.label())]
    InvalidState {
        action: Action,
        phase: WorkflowPhase,
    },
    #[error("an upload is already in progress")]
    UploadInProgress,
    #[error("a picture can hold at most {limit} props")]
    PropLimit { limit: usize },
    #[error("no prop at index {0}")]
    NoSuchProp(usize),
}

impl WorkflowError {
    /// Whether this failure should be shown to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            WorkflowError::Upload(_) | WorkflowError::Registration(_)
        )
    }
}
