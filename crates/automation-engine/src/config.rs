//! Configuration for the editor, history and execution engine
//!
//! All sections default from [`crate::constants`], so an empty or missing
//! config file yields a working setup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::constants::{execution, history, layout, zoom};

/// Errors loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Editor interaction and geometry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Scale factor per wheel notch
    pub zoom_step: f64,
    pub node_width: f64,
    pub header_height: f64,
    pub port_spacing: f64,
    pub port_hit_radius: f64,
    pub edge_curvature: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_zoom: zoom::MIN_ZOOM,
            max_zoom: zoom::MAX_ZOOM,
            zoom_step: zoom::STEP,
            node_width: layout::NODE_WIDTH,
            header_height: layout::HEADER_HEIGHT,
            port_spacing: layout::PORT_SPACING,
            port_hit_radius: layout::PORT_HIT_RADIUS,
            edge_curvature: layout::EDGE_CURVATURE,
        }
    }
}

impl EditorConfig {
    /// Check zoom bounds and geometry
    ///
    /// Zoom bounds must be positive and ordered, the zoom step positive and
    /// every geometry value finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("minZoom", self.min_zoom),
            ("maxZoom", self.max_zoom),
            ("zoomStep", self.zoom_step),
            ("nodeWidth", self.node_width),
            ("headerHeight", self.header_height),
            ("portSpacing", self.port_spacing),
            ("portHitRadius", self.port_hit_radius),
            ("edgeCurvature", self.edge_curvature),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("editor.{} must be finite", name)));
            }
            if value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "editor.{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        if self.min_zoom <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "editor.minZoom must be positive, got {}",
                self.min_zoom
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "editor.minZoom ({}) exceeds editor.maxZoom ({})",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.zoom_step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "editor.zoomStep must be positive, got {}",
                self.zoom_step
            )));
        }
        Ok(())
    }
}

/// Undo history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    pub capacity: usize,
    pub compression_level: i32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: history::CAPACITY,
            compression_level: history::COMPRESSION_LEVEL,
        }
    }
}

/// Execution engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Per-handler timeout; `None` waits indefinitely
    pub node_timeout_ms: Option<u64>,
    /// Upper bound applied to delay nodes
    pub max_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout_ms: None,
            max_delay_ms: execution::MAX_DELAY_MS,
        }
    }
}

/// Settings for host capability hooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HookConfig {
    pub http_timeout_secs: u64,
    pub command_timeout_secs: u64,
    /// Permit `runExternalCommand`; disabled hosts degrade to pass-through
    pub allow_commands: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: execution::HTTP_TIMEOUT_SECS,
            command_timeout_secs: execution::COMMAND_TIMEOUT_SECS,
            allow_commands: true,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub editor: EditorConfig,
    pub history: HistoryConfig,
    pub engine: EngineConfig,
    pub hooks: HookConfig,
}

impl AutomationConfig {
    /// Parse configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section that has constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.editor.validate()
    }

    /// Load configuration from disk, falling back to defaults if missing
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await?;
        Self::from_json_str(&contents)
    }

    /// Save configuration to disk
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, contents).await?;

        log::info!("Configuration saved to {:?}", path);
        Ok(())
    }
}
