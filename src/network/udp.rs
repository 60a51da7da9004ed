//! UDP socket creation and the datagram sink seam

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::constants::SEND_BUFFER_SIZE;

/// Anything that can push a datagram at an address
///
/// The sender talks to this rather than to a socket directly, so failures
/// can be injected in tests.
pub trait DatagramSink: Send {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;

    /// Local address, if bound
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Create an unconnected UDP socket bound to an ephemeral port
pub fn create_socket(bind_addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if bind_addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    if let Err(e) = socket.set_send_buffer_size(SEND_BUFFER_SIZE) {
        tracing::debug!("Could not set send buffer size: {}", e);
    }
    // Lets broadcast destinations such as 255.255.255.255 work
    socket.set_broadcast(true)?;
    socket.bind(&SockAddr::from(bind_addr))?;

    Ok(socket.into())
}

/// Real UDP sink
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    /// Bind to `0.0.0.0:0`
    pub fn bind_any() -> io::Result<Self> {
        Self::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
    }

    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = create_socket(addr)?;
        tracing::debug!("UDP sink bound to {:?}", socket.local_addr().ok());
        Ok(Self { socket })
    }
}

impl DatagramSink for UdpSink {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}
