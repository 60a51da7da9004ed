//! Persisted plugin state
//!
//! The host stores an opaque blob per plugin instance. Ours is JSON holding
//! the endpoint fields and the editor size. Restoring re-validates
//! everything: the port is clamped and a malformed host falls back to the
//! default.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROUTING_ID, DEFAULT_UI_HEIGHT, DEFAULT_UI_WIDTH};
use crate::endpoint::Endpoint;
use crate::error::Error;

/// Editor size limits
pub const MIN_UI_WIDTH: u32 = 400;
pub const MAX_UI_WIDTH: u32 = 1024;
pub const MIN_UI_HEIGHT: u32 = 71;
pub const MAX_UI_HEIGHT: u32 = 700;

/// Current blob format
pub const STATE_VERSION: u32 = 1;

/// Editor geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub width: u32,
    pub height: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            width: DEFAULT_UI_WIDTH,
            height: DEFAULT_UI_HEIGHT,
        }
    }
}

impl UiState {
    /// Size forced into the editor's resize limits
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.clamp(MIN_UI_WIDTH, MAX_UI_WIDTH),
            height: self.height.clamp(MIN_UI_HEIGHT, MAX_UI_HEIGHT),
        }
    }
}

/// Everything saved with a plugin instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginState {
    pub version: u32,
    pub host: String,
    /// Wider than `u16` so out-of-range values from older blobs still parse
    pub port: i64,
    pub routing_id: String,
    pub ui: UiState,
}

impl Default for PluginState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT as i64,
            routing_id: DEFAULT_ROUTING_ID.to_string(),
            ui: UiState::default(),
        }
    }
}

impl PluginState {
    /// Capture the current endpoint verbatim
    pub fn capture(endpoint: &Endpoint, ui: UiState) -> Self {
        Self {
            version: STATE_VERSION,
            host: endpoint.host.clone(),
            port: endpoint.port as i64,
            routing_id: endpoint.routing_id.clone(),
            ui,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::State(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let state: Self = serde_json::from_slice(data).map_err(|e| Error::State(e.to_string()))?;
        if state.version > STATE_VERSION {
            tracing::warn!("State version {} is newer than {}, reading what we can", state.version, STATE_VERSION);
        }
        Ok(state)
    }

    /// Validated endpoint for this state
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::sanitized(&self.host, self.port, &self.routing_id)
    }
}
