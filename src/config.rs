//! Application configuration
//!
//! Loaded from a TOML file; every section has defaults so a partial or
//! missing file still yields a usable config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROUTING_ID};
use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::protocol::WireOptions;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: EndpointSettings,
    pub wire: WireOptions,
    pub simulation: SimulationSettings,
}

/// Where telemetry goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub host: String,
    pub port: i64,
    pub routing_id: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT as i64,
            routing_id: DEFAULT_ROUTING_ID.to_string(),
        }
    }
}

impl EndpointSettings {
    /// Validated endpoint; out-of-range ports are clamped
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint::sanitized(&self.host, self.port, &self.routing_id)
    }
}

/// Free-running host used by the sender binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub sample_rate: u32,
    pub block_size: usize,
    pub tempo_bpm: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
    /// Start with the transport rolling
    pub playing: bool,
    /// Jump back to the start after this many bars; 0 never loops
    pub loop_bars: u32,
    /// How often the status line is printed
    pub status_interval_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            tempo_bpm: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            playing: true,
            loop_bars: 0,
            status_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::File(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::File(e.to_string()))
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Write to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::File(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, self.to_toml()?)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))
    }

    /// Per-user config location, e.g. `~/.config/daw-osc-sender/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "daw-osc-sender").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load `path` (or the default path); fall back to defaults if absent
    ///
    /// A file that exists but does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        tracing::info!("Loading config from {}", path.display());
        Self::load(&path)
    }
}
