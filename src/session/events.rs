//! Inbound control events and outbound UI notifications

use crate::endpoint::Endpoint;
use crate::error::ConfigError;

use super::state::UiState;

/// Something the host or the UI wants the session to do
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// User edited the destination host
    SetHost(String),
    /// User edited the routing identifier
    SetRoutingId(String),
    /// Host changed the port parameter (plain value)
    PortChanged(i64),
    /// Host changed the port parameter (normalized `[0, 1]`)
    PortChangedNormalized(f32),
    /// Editor was resized
    UiResized { width: u32, height: u32 },
    /// Host handed back a previously saved state blob
    RestoreState(Vec<u8>),
}

/// UI-side observer of session state
///
/// Called on the control thread.
pub trait StateListener: Send + Sync {
    /// State was restored; refresh displayed values
    fn state_restored(&self, endpoint: &Endpoint, ui: &UiState);

    /// A user change was rejected at the endpoint boundary
    fn change_rejected(&self, _error: &ConfigError) {}
}
