//! UDP transport.
//!
//! The receive buffer holds one byte more than the codec's datagram limit, so an
//! oversized datagram arrives long enough for the codec to reject it instead of
//! being silently cut down to a plausible-looking prefix.

use crate::core::codec::MAX_DATAGRAM_SIZE;
use crate::error::{ProtocolError, Result};
use crate::transport::Transport;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{info, instrument, trace, warn};

#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    recv_buffer_size: usize,
}

impl UdpTransport {
    /// Bind exactly `addr`
    #[instrument]
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| ProtocolError::TransportError(format!("Failed to bind {addr}: {e}")))?;
        Self::from_socket(socket)
    }

    /// Bind `addr`, falling back to an OS-chosen port on the same IP when the
    /// configured port is unavailable
    #[instrument]
    pub async fn bind_with_fallback(addr: SocketAddr) -> Result<Self> {
        match UdpSocket::bind(addr).await {
            Ok(socket) => Self::from_socket(socket),
            Err(e) => {
                warn!(%addr, error = %e, "Configured port unavailable, using an ephemeral port");
                let ephemeral = SocketAddr::new(addr.ip(), 0);
                Self::bind(ephemeral).await
            }
        }
    }

    fn from_socket(socket: UdpSocket) -> Result<Self> {
        let local_addr = socket.local_addr()?;
        info!(%local_addr, "UDP transport bound");
        Ok(Self {
            socket,
            local_addr,
            recv_buffer_size: MAX_DATAGRAM_SIZE + 1,
        })
    }
}

impl Transport for UdpTransport {
    async fn send_to(&self, datagram: &[u8], peer: SocketAddr) -> Result<()> {
        let sent = self
            .socket
            .send_to(datagram, peer)
            .await
            .map_err(|e| ProtocolError::TransportError(format!("Send to {peer} failed: {e}")))?;
        trace!(%peer, bytes = sent, "Datagram sent");
        Ok(())
    }

    async fn recv_from(&self) -> Result<(Bytes, SocketAddr)> {
        let mut buf = vec![0u8; self.recv_buffer_size];
        let (n, peer) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|e| ProtocolError::TransportError(format!("Receive failed: {e}")))?;
        buf.truncate(n);
        trace!(%peer, bytes = n, "Datagram received");
        Ok((Bytes::from(buf), peer))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }
}
