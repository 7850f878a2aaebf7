//! Lookup server.
//!
//! One task, one transport, strictly serial: a datagram is decoded, dispatched to
//! the sender's [`ServerSession`], answered, and only then is the next datagram
//! received. Sessions are keyed by peer address and created only by a Hello; the
//! lookup table is the only state they share, and it is read-only.

use crate::config::{ServerConfig, Settings};
use crate::core::codec::MessageCodec;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::lookup::LookupTable;
use crate::protocol::message::{Message, MessageKind};
use crate::protocol::session::{ServerEvent, ServerSession};
use crate::transport::{Transport, UdpTransport};
use crate::utils::metrics::Metrics;
use crate::utils::timeout::maybe_with_timeout;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Load the lookup table described by `config`.
///
/// A missing or malformed source is fatal when `require_records` is set;
/// otherwise the server runs with an empty table and every lookup misses.
pub fn load_table(config: &ServerConfig) -> Result<LookupTable> {
    let Some(path) = &config.records_path else {
        warn!("No lookup table configured, every lookup will miss");
        return Ok(LookupTable::empty());
    };

    match LookupTable::load(path) {
        Ok(table) => Ok(table),
        Err(err) if !config.require_records => {
            warn!(error = %err, "Lookup table unavailable, every lookup will miss");
            Ok(LookupTable::empty())
        }
        Err(err) => Err(err),
    }
}

pub struct LookupServer<T: Transport> {
    transport: T,
    table: Arc<LookupTable>,
    config: ServerConfig,
    codec: MessageCodec,
    sessions: HashMap<SocketAddr, ServerSession>,
    metrics: Arc<Metrics>,
}

impl LookupServer<UdpTransport> {
    /// Load the table and bind the configured server endpoint over UDP
    pub async fn bind(settings: &Settings) -> Result<Self> {
        let table = load_table(&settings.server)?;
        let transport = UdpTransport::bind_with_fallback(settings.server_endpoint()?).await?;
        Ok(Self::new(transport, Arc::new(table), settings.server.clone()))
    }
}

impl<T: Transport> LookupServer<T> {
    pub fn new(transport: T, table: Arc<LookupTable>, config: ServerConfig) -> Self {
        Self {
            transport,
            table,
            config,
            codec: MessageCodec::default(),
            sessions: HashMap::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Serve until CTRL+C
    pub async fn run_until_ctrl_c(&mut self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received CTRL+C signal, shutting down");
                let _ = shutdown_tx.send(()).await;
            }
        });

        self.run(shutdown_rx).await
    }

    /// Serve until a shutdown signal arrives on `shutdown_rx`
    #[instrument(skip_all, fields(local = ?self.transport.local_addr().ok()))]
    pub async fn run(&mut self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!(records = self.table.len(), "Lookup server ready");
        let mut shutdown_open = true;

        loop {
            let wait = self.next_idle_deadline();
            tokio::select! {
                signal = shutdown_rx.recv(), if shutdown_open => match signal {
                    Some(()) => {
                        info!(sessions = self.sessions.len(), "Shutting down lookup server");
                        break;
                    }
                    None => shutdown_open = false,
                },

                received = maybe_with_timeout(self.transport.recv_from(), wait) => {
                    match received {
                        Ok((datagram, peer)) => {
                            self.handle_datagram(&datagram, peer).await;
                            self.expire_idle_sessions().await;
                        }
                        Err(ProtocolError::Timeout) => self.expire_idle_sessions().await,
                        Err(ProtocolError::ConnectionClosed) => {
                            error!("Transport closed");
                            self.metrics.log_metrics();
                            return Err(ProtocolError::ConnectionClosed);
                        }
                        Err(err) => {
                            self.metrics.transport_error();
                            error!(error = %err, "Receive failed");
                        }
                    }
                }
            }
        }

        self.metrics.log_metrics();
        Ok(())
    }

    async fn handle_datagram(&mut self, datagram: &[u8], peer: SocketAddr) {
        self.metrics.message_received(datagram.len() as u64);

        let msg = match self.codec.decode_message(datagram) {
            Ok(msg) => msg,
            Err(err) => {
                self.metrics.decode_error();
                warn!(%peer, bytes = datagram.len(), error = %err, "Undecodable datagram");
                let reply = Message::error(0, err.reply_reason());
                if let Err(err) = self.send(peer, &reply).await {
                    self.drop_session(peer, &err);
                }
                return;
            }
        };
        info!(%peer, message = %msg, "[Server] Received");

        let transition = match self.sessions.get_mut(&peer) {
            Some(session) => session.handle(msg, &self.table),
            None if msg.kind() == MessageKind::Hello => {
                if self.sessions.len() >= self.config.max_sessions {
                    self.metrics.protocol_error();
                    warn!(%peer, limit = self.config.max_sessions, "Session limit reached");
                    let reply = Message::error(msg.sequence_id, constants::ERR_TOO_MANY_SESSIONS);
                    if let Err(err) = self.send(peer, &reply).await {
                        self.drop_session(peer, &err);
                    }
                    return;
                }
                let mut session = ServerSession::new(peer, self.config.banner.clone());
                let transition = session.handle(msg, &self.table);
                self.sessions.insert(peer, session);
                self.metrics.session_opened();
                info!(%peer, sessions = self.sessions.len(), "Session opened");
                transition
            }
            // Not stored: a session only exists once the peer has said Hello.
            None => ServerSession::new(peer, self.config.banner.as_str()).handle(msg, &self.table),
        };

        match &transition.event {
            ServerEvent::LookupAnswered { found } => self.metrics.lookup_answered(*found),
            ServerEvent::Rejected(err) => {
                self.metrics.protocol_error();
                warn!(%peer, error = %err, "Message refused");
            }
            _ => {}
        }

        if let Some(reply) = &transition.reply {
            if let Err(err) = self.send(peer, reply).await {
                self.drop_session(peer, &err);
                return;
            }
        }

        if matches!(transition.event, ServerEvent::Closed | ServerEvent::Aborted)
            && self.sessions.remove(&peer).is_some()
        {
            self.metrics.session_closed();
            info!(%peer, sessions = self.sessions.len(), "Session closed");
        }
    }

    /// How long the next receive may wait before some session runs out of idle
    /// time. `None` waits forever: no timeout configured, or no sessions.
    fn next_idle_deadline(&self) -> Option<Duration> {
        let idle = self.config.idle_timeout_ms?;
        let now = Instant::now();
        self.sessions
            .values()
            .map(|session| idle.saturating_sub(session.idle_for(now)))
            .min()
    }

    /// Idle sessions get a server-initiated End; sessions that already got one
    /// and stayed silent for another full timeout are dropped.
    async fn expire_idle_sessions(&mut self) {
        let Some(idle) = self.config.idle_timeout_ms else {
            return;
        };
        let now = Instant::now();
        let peers: Vec<SocketAddr> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.idle_for(now) >= idle)
            .map(|(peer, _)| *peer)
            .collect();

        for peer in peers {
            let Some(session) = self.sessions.get_mut(&peer) else {
                continue;
            };

            match session.close(constants::END_IDLE) {
                Some(end) => {
                    info!(%peer, "Session idle, ending it");
                    if let Err(err) = self.send(peer, &end).await {
                        self.drop_session(peer, &err);
                    }
                }
                None => {
                    warn!(%peer, "Peer never confirmed End, dropping session");
                    if self.sessions.remove(&peer).is_some() {
                        self.metrics.session_closed();
                    }
                }
            }
        }
    }

    async fn send(&self, peer: SocketAddr, msg: &Message) -> Result<()> {
        let datagram = match self.codec.encode_message(msg) {
            Ok(datagram) => datagram,
            Err(err) => {
                warn!(%peer, error = %err, "Reply could not be encoded, sending Error instead");
                self.codec
                    .encode_message(&Message::error(msg.sequence_id, err.reply_reason()))?
            }
        };

        self.transport.send_to(&datagram, peer).await?;
        self.metrics.message_sent(datagram.len() as u64);
        info!(%peer, message = %msg, "[Server] Sent");
        Ok(())
    }

    fn drop_session(&mut self, peer: SocketAddr, err: &ProtocolError) {
        self.metrics.transport_error();
        error!(%peer, error = %err, "Send failed, dropping session");
        if self.sessions.remove(&peer).is_some() {
            self.metrics.session_closed();
        } else {
            debug!(%peer, "No session to drop");
        }
    }
}
