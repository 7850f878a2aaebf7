//! Lookup client.
//!
//! Drives one complete exchange: Hello, then one Lookup/reply/Ack round per
//! query, then End. Every send is followed by a receive for its answer; without
//! a configured `response_timeout_ms` a lost datagram blocks the client forever.

use crate::config::{ClientConfig, Settings};
use crate::core::codec::MessageCodec;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::message::{LookupQuery, LookupRecord, Message, MessageKind};
use crate::protocol::session::{ClientEvent, ClientSession};
use crate::transport::{Transport, UdpTransport};
use crate::utils::timeout::maybe_with_timeout;
use std::net::SocketAddr;
use tracing::{info, instrument, warn};

/// Answer to one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(LookupRecord),
    NotFound { query: LookupQuery, reason: String },
}

/// What a completed exchange produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Banner from the server's Welcome
    pub banner: String,
    /// One entry per answered query, in send order
    pub outcomes: Vec<LookupOutcome>,
    /// True when the server sent End first
    pub ended_by_server: bool,
}

impl ExchangeReport {
    pub fn found(&self) -> impl Iterator<Item = &LookupRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            LookupOutcome::Found(record) => Some(record),
            LookupOutcome::NotFound { .. } => None,
        })
    }
}

pub struct LookupClient<T: Transport> {
    transport: T,
    server: SocketAddr,
    codec: MessageCodec,
    config: ClientConfig,
}

impl LookupClient<UdpTransport> {
    /// Bind the configured client endpoint over UDP and target the configured server
    pub async fn bind(settings: &Settings) -> Result<Self> {
        let transport = UdpTransport::bind_with_fallback(settings.client_endpoint()?).await?;
        Ok(Self::new(
            transport,
            settings.server_endpoint()?,
            settings.client.clone(),
        ))
    }
}

impl<T: Transport> LookupClient<T> {
    pub fn new(transport: T, server: SocketAddr, config: ClientConfig) -> Self {
        Self {
            transport,
            server,
            codec: MessageCodec::default(),
            config,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Run the exchange with the configured query list
    pub async fn run(&self) -> Result<ExchangeReport> {
        self.run_queries(&self.config.lookups).await
    }

    /// Run the exchange with `queries`
    #[instrument(skip_all, fields(server = %self.server, queries = queries.len()))]
    pub async fn run_queries(&self, queries: &[LookupQuery]) -> Result<ExchangeReport> {
        let mut session = ClientSession::new(self.server);
        let mut report = ExchangeReport::default();

        let hello = session.hello(self.config.greeting.as_str())?;
        self.send(&hello).await?;
        match self.receive(&mut session).await? {
            ClientEvent::Welcomed(banner) => report.banner = banner,
            ClientEvent::PeerEnded { reason, reply } => {
                return self.finish_early(report, reason, reply).await;
            }
            other => return Err(unexpected_event(&other)),
        }

        for query in queries {
            let lookup = session.lookup(query.clone())?;
            self.send(&lookup).await?;

            match self.receive(&mut session).await? {
                ClientEvent::Resolved { record, ack } => {
                    self.send(&ack).await?;
                    report.outcomes.push(LookupOutcome::Found(record));
                }
                ClientEvent::Rejected { reason, ack } => {
                    self.send(&ack).await?;
                    report.outcomes.push(LookupOutcome::NotFound {
                        query: query.clone(),
                        reason,
                    });
                }
                ClientEvent::PeerEnded { reason, reply } => {
                    return self.finish_early(report, reason, reply).await;
                }
                other => return Err(unexpected_event(&other)),
            }
        }

        let end = session.end(constants::END_CLIENT_DONE)?;
        self.send(&end).await?;
        match self.receive(&mut session).await? {
            ClientEvent::Closed => {}
            // Both sides sent End at the same time.
            ClientEvent::PeerEnded { .. } => {}
            other => return Err(unexpected_event(&other)),
        }

        info!(
            found = report.found().count(),
            total = report.outcomes.len(),
            "[Client] Exchange complete"
        );
        Ok(report)
    }

    async fn finish_early(
        &self,
        mut report: ExchangeReport,
        reason: String,
        reply: Message,
    ) -> Result<ExchangeReport> {
        info!(%reason, "[Client] Server ended the session");
        self.send(&reply).await?;
        report.ended_by_server = true;
        Ok(report)
    }

    /// Wait for the server's answer and apply it to the session
    async fn receive(&self, session: &mut ClientSession) -> Result<ClientEvent> {
        loop {
            let (datagram, from) =
                maybe_with_timeout(self.transport.recv_from(), self.config.response_timeout_ms)
                    .await?;

            if from != self.server {
                warn!(%from, "Ignoring datagram from unexpected peer");
                continue;
            }

            let msg = match self.codec.decode_message(&datagram) {
                Ok(msg) => msg,
                Err(err) => {
                    warn!(error = %err, "[Client] Undecodable reply");
                    self.send(&Message::error(0, err.reply_reason())).await?;
                    return Err(err);
                }
            };
            info!(message = %msg, "[Client] Received");

            let seq = msg.sequence_id;
            let is_error = msg.kind() == MessageKind::Error;
            return match session.handle(msg) {
                Ok(event) => Ok(event),
                Err(err) => {
                    warn!(error = %err, "[Client] Unexpected reply");
                    // Errors are never answered with another Error.
                    if !is_error {
                        self.send(&Message::error(seq, err.reply_reason())).await?;
                    }
                    Err(err)
                }
            };
        }
    }

    async fn send(&self, msg: &Message) -> Result<()> {
        let datagram = self.codec.encode_message(msg)?;
        self.transport.send_to(&datagram, self.server).await?;
        info!(message = %msg, "[Client] Sent");
        Ok(())
    }
}

fn unexpected_event(event: &ClientEvent) -> ProtocolError {
    ProtocolError::ProtocolViolation(format!(
        "{}: {event:?}",
        constants::ERR_UNEXPECTED_MESSAGE
    ))
}
