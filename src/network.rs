//! UDP datagram transport with a per-call receive timeout.
//!
//! [`UdpTransport`] is the production [`Transport`]: a connected
//! `std::net::UdpSocket` whose read timeout bounds each receive attempt.
//! Timeouts surface as `Ok(None)`; everything else is an I/O error.

use std::net::{ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::ProtocolError;
use crate::session::Transport;

/// Largest packet on the wire is the 264-byte data packet; anything bigger
/// is not ours.
const RECV_BUFFER_LEN: usize = 512;

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `peer`, so `send` and
    /// `recv` only talk to that one address.
    pub fn connect<A: ToSocketAddrs>(peer: A) -> Result<Self, ProtocolError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(peer)?;
        Ok(UdpTransport { socket })
    }

    pub fn from_socket(socket: UdpSocket) -> Self {
        UdpTransport { socket }
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.socket.send(bytes)?;
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, ProtocolError> {
        self.socket.set_read_timeout(Some(timeout))?;

        let mut buf = [0u8; RECV_BUFFER_LEN];
        match self.socket.recv(&mut buf) {
            Ok(n) => Ok(Some(buf[..n].to_vec())),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(ProtocolError::Io(e)),
        }
    }
}
