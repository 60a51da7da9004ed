//! Network subsystem for UDP/OSC transport

pub mod sender;
pub mod udp;

pub use sender::{SendReport, SenderStats, SenderStatsSnapshot, TransportSender};
pub use udp::{create_socket, DatagramSink, UdpSink};
