//! In-process datagram network.
//!
//! Every [`MemoryTransport`] bound on a [`MemoryNetwork`] gets an inbox keyed by its
//! address. Datagrams to an unbound address vanish, as they would over UDP, and
//! [`MemoryNetwork::drop_next`] discards upcoming datagrams to model loss.

use crate::error::{ProtocolError, Result};
use crate::transport::Transport;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::trace;

type Datagram = (Bytes, SocketAddr);

#[derive(Debug, Default)]
struct Registry {
    inboxes: Mutex<HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>>,
    drop_budget: AtomicUsize,
}

/// Shared switchboard for memory transports
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    registry: Arc<Registry>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a transport at `addr`. Fails if the address is already taken.
    pub fn bind(&self, addr: SocketAddr) -> Result<MemoryTransport> {
        let mut inboxes = self
            .registry
            .inboxes
            .lock()
            .map_err(|_| ProtocolError::TransportError("Memory network poisoned".into()))?;

        if inboxes.get(&addr).is_some_and(|tx| !tx.is_closed()) {
            return Err(ProtocolError::TransportError(format!(
                "Address already in use: {addr}"
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        inboxes.insert(addr, tx);
        Ok(MemoryTransport {
            local_addr: addr,
            inbox: tokio::sync::Mutex::new(rx),
            registry: Arc::clone(&self.registry),
        })
    }

    /// Silently discard the next `count` datagrams sent on this network
    pub fn drop_next(&self, count: usize) {
        self.registry.drop_budget.store(count, Ordering::SeqCst);
    }
}

/// One endpoint on a [`MemoryNetwork`]
#[derive(Debug)]
pub struct MemoryTransport {
    local_addr: SocketAddr,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
    registry: Arc<Registry>,
}

impl Transport for MemoryTransport {
    async fn send_to(&self, datagram: &[u8], peer: SocketAddr) -> Result<()> {
        let dropped = self
            .registry
            .drop_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            trace!(%peer, bytes = datagram.len(), "Datagram dropped");
            return Ok(());
        }

        let inboxes = self
            .registry
            .inboxes
            .lock()
            .map_err(|_| ProtocolError::TransportError("Memory network poisoned".into()))?;

        match inboxes.get(&peer) {
            Some(tx) => {
                // A closed inbox behaves like an unbound port.
                let _ = tx.send((Bytes::copy_from_slice(datagram), self.local_addr));
            }
            None => trace!(%peer, "No endpoint bound, datagram lost"),
        }
        Ok(())
    }

    async fn recv_from(&self) -> Result<(Bytes, SocketAddr)> {
        let mut inbox = self.inbox.lock().await;
        inbox.recv().await.ok_or(ProtocolError::ConnectionClosed)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }
}
