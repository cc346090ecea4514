//! Settings and user actions
//!
//! Settings are read from a `settings.toml` file in the user's config
//! directory. Every key is optional; missing keys take their default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use super::state::WorkflowPhase;
use crate::error::ConfigError;

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "propcam";

pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.graph.cool/file/v1/propcam";
pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.graph.cool/simple/v1/propcam";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Something the user can trigger from the camera screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Capture,
    AddProp,
    TransformProp,
    Upload,
    ClosePreview,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Capture => "Capture",
            Action::AddProp => "Add prop",
            Action::TransformProp => "Move prop",
            Action::Upload => "Upload",
            Action::ClosePreview => "Close preview",
        }
    }

    /// Whether the control for this action should be enabled in `phase`
    pub fn is_available(&self, phase: WorkflowPhase) -> bool {
        match self {
            Action::Capture => matches!(phase, WorkflowPhase::Idle | WorkflowPhase::Previewing),
            Action::AddProp | Action::TransformProp | Action::Upload | Action::ClosePreview => {
                phase == WorkflowPhase::Previewing
            }
        }
    }

    pub fn all() -> &'static [Action] {
        &[
            Action::Capture,
            Action::AddProp,
            Action::TransformProp,
            Action::Upload,
            Action::ClosePreview,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Multipart endpoint files are posted to
    pub upload_endpoint: String,
    /// GraphQL endpoint photos are registered with
    pub graphql_endpoint: String,
    /// Where captures and composites are written
    pub output_dir: PathBuf,
    /// JPEG quality of composites, 1 to 100
    pub composite_quality: u8,
    pub max_props: usize,
    pub max_upload_bytes: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            graphql_endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_string(),
            output_dir: std::env::temp_dir().join(APP_NAME),
            composite_quality: 100,
            max_props: crate::editor::props::DEFAULT_PROP_LIMIT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.composite_quality) {
            return Err(ConfigError::Invalid(format!(
                "composite_quality must be between 1 and 100, got {}",
                self.composite_quality
            )));
        }
        if self.max_props == 0 {
            return Err(ConfigError::Invalid("max_props must be at least 1".into()));
        }
        if self.upload_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("upload_endpoint is empty".into()));
        }
        if self.graphql_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("graphql_endpoint is empty".into()));
        }
        Ok(())
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

/// Load from the default location, falling back to defaults when absent
pub fn load() -> Result<Settings, ConfigError> {
    if let Some(path) = default_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    debug!("No settings file found, using defaults");
    Ok(Settings::default())
}

pub fn load_from_path(path: &Path) -> Result<Settings, ConfigError> {
    debug!("Loading settings from {:?}", path);
    let content = fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_to_path(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(settings)?;
    fs::write(path, content)?;
    Ok(())
}
