//! # DAW OSC Sender
//!
//! Streams the host's transport state (tempo, signature, position, play and
//! record flags) to a remote OSC receiver once per audio block, without ever
//! blocking the audio thread.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────── AUDIO THREAD ─────────────────────────────┐
//! │  host ──► SamplingDriver::on_block (driver::sampler)                  │
//! │              │ PlayHead query (default snapshot on failure)           │
//! │              ├──► SnapshotStore::write   (transport::snapshot)        │
//! │              └──► Mailbox::post + try_send(wake)   (driver::mailbox)  │
//! └──────────────────────────────┼────────────────────────────────────────┘
//!                                │ single slot, last write wins
//!                                ▼
//! ┌──────────────────────────── WORKER THREAD ────────────────────────────┐
//! │  SendWorker (driver::worker)                                          │
//! │     Mailbox::claim ──► protocol::encode ──► TransportSender::send     │
//! │                                             │ EndpointConfig read     │
//! │                                             ▼ once per batch          │
//! │                               UDP: /<routing-id>/BPM ... (rosc)       │
//! └───────────────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────── CONTROL THREAD ────────────────────────────┐
//! │  ControlEvent ──► Session::handle_event ──► EndpointConfig            │
//! │  PortParameter ──► set_port (exactly once per change)                 │
//! │  PluginState save / restore (serde_json)                              │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod network;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
pub use session::Session;

/// Application-wide constants
pub mod constants {
    /// Lowest destination port accepted by the endpoint
    pub const MIN_PORT: u16 = 1024;

    /// Highest destination port accepted by the endpoint
    pub const MAX_PORT: u16 = 65535;

    /// Default destination port
    pub const DEFAULT_PORT: u16 = 9000;

    /// Default destination host
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Default routing identifier (first OSC address segment)
    pub const DEFAULT_ROUTING_ID: &str = "main";

    /// Longest accepted host name (DNS limit)
    pub const MAX_HOST_LEN: usize = 253;

    /// Maximum packet size for UDP
    pub const MAX_PACKET_SIZE: usize = 1472; // MTU - IP/UDP headers

    /// Socket send buffer size in bytes
    pub const SEND_BUFFER_SIZE: usize = 64 * 1024;

    /// Default editor width persisted with the plugin state
    pub const DEFAULT_UI_WIDTH: u32 = 400;

    /// Default editor height persisted with the plugin state
    pub const DEFAULT_UI_HEIGHT: u32 = 71;
}
