//! Error types for the transport sender

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transmit error: {0}")]
    Transmit(#[from] TransmitError),

    #[error("State error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected endpoint changes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Port {value} outside [{min}, {max}]")]
    PortOutOfRange { value: i64, min: u16, max: u16 },

    #[error("Invalid host: {0:?}")]
    InvalidHost(String),

    #[error("Config file: {0}")]
    File(String),
}

/// Network transmission failures
///
/// These never leave the sender; they are counted and logged.
#[derive(Error, Debug)]
pub enum TransmitError {
    #[error("Failed to resolve {host}:{port}: {reason}")]
    Resolve { host: String, port: u16, reason: String },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Send failed: {0}")]
    SendFailed(#[from] std::io::Error),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// Host play head query failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayHeadError {
    #[error("Host provided no play head")]
    Unavailable,

    #[error("Host could not report a position")]
    NoPosition,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
