//! Screen capture using the xcap library
//!
//! The primary monitor stands in for a camera: each capture grabs one frame
//! and writes it to the output directory as a PNG.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::{debug, info};
use xcap::Monitor;

use super::{CaptureProvider, Picture, PictureMetadata};
use crate::error::CaptureError;

/// Information about the monitor a frame was grabbed from
#[derive(Debug, Clone)]
pub struct MonitorInfo {
    pub id: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
    pub scale_factor: f32,
}

impl MonitorInfo {
    fn from_xcap(monitor: &Monitor) -> Self {
        Self {
            id: monitor.id().unwrap_or(0),
            name: monitor.name().unwrap_or_default(),
            width: monitor.width().unwrap_or(0),
            height: monitor.height().unwrap_or(0),
            is_primary: monitor.is_primary().unwrap_or(false),
            scale_factor: monitor.scale_factor().unwrap_or(1.0),
        }
    }
}

/// Capture provider backed by the primary monitor
#[derive(Clone, Debug)]
pub struct ScreenCapture {
    output_dir: PathBuf,
}

impl ScreenCapture {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl CaptureProvider for ScreenCapture {
    async fn capture(&self) -> Result<Picture, CaptureError> {
        let output_dir = self.output_dir.clone();
        tokio::task::spawn_blocking(move || capture_primary_monitor(&output_dir)).await?
    }
}

/// Get the primary monitor, or the first one if none is flagged primary
pub fn get_primary_monitor() -> Result<MonitorInfo, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::Device(e.to_string()))?;

    monitors
        .iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or(monitors.first())
        .map(MonitorInfo::from_xcap)
        .ok_or(CaptureError::NoMonitor)
}

fn capture_primary_monitor(output_dir: &std::path::Path) -> Result<Picture, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::Device(e.to_string()))?;

    let monitor = monitors
        .iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or(monitors.first())
        .ok_or(CaptureError::NoMonitor)?;

    let info = MonitorInfo::from_xcap(monitor);
    debug!("Capturing monitor {} ({})", info.id, info.name);

    let image = monitor
        .capture_image()
        .map_err(|e| CaptureError::Device(e.to_string()))?;

    std::fs::create_dir_all(output_dir).map_err(|source| CaptureError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let path = output_dir.join(format!("capture_{}.png", timestamp));

    let metadata = PictureMetadata {
        format: Some("png".to_string()),
        width: image.width(),
        height: image.height(),
    };
    image.save(&path)?;

    info!(
        "Captured {}x{} frame from {} to {:?}",
        metadata.width, metadata.height, info.name, path
    );
    Ok(Picture::new(path).with_metadata(metadata))
}
