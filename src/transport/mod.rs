//! # Transport Layer
//!
//! Datagram send/receive behind the [`Transport`] trait.
//!
//! ## Implementations
//! - **UDP**: [`udp::UdpTransport`], a tokio `UdpSocket` with a fixed receive buffer
//! - **Memory**: [`memory::MemoryNetwork`], in-process datagrams for tests and demos
//!
//! Sessions never own a socket; the service layer passes a transport handle in,
//! so the whole exchange can run against the in-memory network.

use crate::error::Result;
use bytes::Bytes;
use std::net::SocketAddr;

pub mod memory;
pub mod udp;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use udp::UdpTransport;

/// Unreliable, unordered, message-preserving datagram transport
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send one datagram to `peer`
    async fn send_to(&self, datagram: &[u8], peer: SocketAddr) -> Result<()>;

    /// Wait for the next datagram and its sender
    async fn recv_from(&self) -> Result<(Bytes, SocketAddr)>;

    /// Address this transport is bound to
    fn local_addr(&self) -> Result<SocketAddr>;
}
