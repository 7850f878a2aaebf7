//! Session state machine for both roles.
//!
//! Sessions are pure: they take one decoded [`Message`], update their
//! [`SessionState`], and say what to send back. All I/O lives in
//! [`crate::service`], which keeps these rules testable without sockets.
//!
//! Server dispatch on `(phase, kind)`:
//!
//! | phase              | Hello      | Lookup              | Ack (matching) | End          | Error  | other  |
//! |--------------------|------------|---------------------|----------------|--------------|--------|--------|
//! | Init               | Welcome    | Error               | Error          | Error        | ignore | Error  |
//! | Greeted / Querying | Error      | Reply, await Ack    | clear pending  | End, Closed  | Closed | Error  |
//! | Ending             | Error      | Error               | Error          | Closed       | Closed | Error  |
//!
//! A Lookup that arrives while an Ack is still pending is refused and not
//! processed. Every refusal is an `Error` reply; none of them ends the session.
//! An `Error` from a greeted peer does: the peer has given up, so the session
//! closes without a reply.

use crate::error::{constants, ProtocolError, Result};
use crate::protocol::lookup::LookupTable;
use crate::protocol::message::{LookupQuery, LookupRecord, Message, MessageKind, Payload};
use crate::protocol::state::{Phase, SessionState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What the server session did with a message
#[derive(Debug)]
pub enum ServerEvent {
    /// Hello accepted, Welcome sent
    Greeted,
    /// Lookup processed; `found` tells whether a record was returned
    LookupAnswered { found: bool },
    /// Pending reply acknowledged
    Acked(u32),
    /// End exchange finished
    Closed,
    /// Peer reported an error and gave up; session closed without reply
    Aborted,
    /// Message logged and dropped without reply
    Ignored,
    /// Message refused with an `Error` reply
    Rejected(ProtocolError),
}

/// Result of feeding one message into a [`ServerSession`]
#[derive(Debug)]
pub struct Transition {
    pub event: ServerEvent,
    pub reply: Option<Message>,
}

impl Transition {
    fn reply(event: ServerEvent, reply: Message) -> Self {
        Self {
            event,
            reply: Some(reply),
        }
    }

    fn silent(event: ServerEvent) -> Self {
        Self { event, reply: None }
    }

    fn reject(sequence_id: u32, err: ProtocolError) -> Self {
        Self {
            reply: Some(Message::error(sequence_id, err.reply_reason())),
            event: ServerEvent::Rejected(err),
        }
    }
}

/// Server side of one peer's conversation
#[derive(Debug, Clone)]
pub struct ServerSession {
    state: SessionState,
    banner: String,
    last_sequence_id: u32,
    last_activity: Instant,
}

impl ServerSession {
    pub fn new(peer: SocketAddr, banner: impl Into<String>) -> Self {
        Self {
            state: SessionState::new(peer),
            banner: banner.into(),
            last_sequence_id: 0,
            last_activity: Instant::now(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn peer(&self) -> SocketAddr {
        self.state.peer
    }

    pub fn is_closed(&self) -> bool {
        self.state.phase.is_closed()
    }

    /// When the peer last sent a message, or the server last sent an End
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Dispatch one message on `(phase, kind)` and produce at most one reply
    pub fn handle(&mut self, msg: Message, table: &LookupTable) -> Transition {
        let kind = msg.kind();
        let seq = msg.sequence_id;
        let peer = self.state.peer;
        self.last_sequence_id = self.last_sequence_id.max(seq);
        self.last_activity = Instant::now();

        match (self.state.phase, msg.payload) {
            (Phase::Init | Phase::Closed, Payload::Error(reason)) => {
                warn!(%peer, sequence_id = seq, %reason, "Peer reported an error");
                Transition::silent(ServerEvent::Ignored)
            }
            (_, Payload::Error(reason)) => {
                warn!(%peer, sequence_id = seq, %reason, "Peer reported an error, closing session");
                self.state.phase = Phase::Closed;
                self.state.pending_sequence_id = None;
                Transition::silent(ServerEvent::Aborted)
            }

            (Phase::Init, Payload::Hello(greeting)) => {
                debug!(%peer, sequence_id = seq, %greeting, "Greeting received");
                self.state.phase = Phase::Greeted;
                Transition::reply(
                    ServerEvent::Greeted,
                    Message::welcome(seq, self.banner.clone()),
                )
            }
            (Phase::Init, _) => Transition::reject(seq, violation(constants::ERR_EXPECTED_HELLO)),

            (Phase::Greeted | Phase::Querying, Payload::Hello(_)) => {
                Transition::reject(seq, violation(constants::ERR_ALREADY_GREETED))
            }

            (Phase::Greeted | Phase::Querying, Payload::Lookup(query)) => {
                if let Some(pending) = self.state.pending_sequence_id {
                    return Transition::reject(
                        seq,
                        violation(format!(
                            "{} (sequence {pending})",
                            constants::ERR_AWAITING_ACK
                        )),
                    );
                }
                self.answer_lookup(seq, &query, table)
            }

            (Phase::Greeted | Phase::Querying, Payload::Ack(echo)) => {
                match self.state.pending_sequence_id {
                    Some(pending) if seq == pending && echo == pending => {
                        debug!(%peer, sequence_id = seq, "Reply acknowledged");
                        self.state.pending_sequence_id = None;
                        Transition::silent(ServerEvent::Acked(pending))
                    }
                    Some(pending) => {
                        let received = if seq != pending { seq } else { echo };
                        Transition::reject(
                            seq,
                            ProtocolError::SequenceMismatch {
                                expected: pending,
                                received,
                            },
                        )
                    }
                    None => Transition::reject(seq, violation(constants::ERR_NOTHING_TO_ACK)),
                }
            }

            (Phase::Greeted | Phase::Querying, Payload::End(reason)) => {
                if let Some(pending) = self.state.pending_sequence_id {
                    debug!(%peer, pending, "Peer ended without acknowledging last reply");
                }
                debug!(%peer, sequence_id = seq, %reason, "Peer ending session");
                // Ending lasts only until our own End is handed to the transport.
                self.state.phase = Phase::Closed;
                self.state.pending_sequence_id = None;
                Transition::reply(
                    ServerEvent::Closed,
                    Message::end(seq, constants::END_SERVER_GOODBYE),
                )
            }

            (Phase::Ending, Payload::End(reason)) => {
                debug!(%peer, sequence_id = seq, %reason, "Peer confirmed end");
                self.state.phase = Phase::Closed;
                self.state.pending_sequence_id = None;
                Transition::silent(ServerEvent::Closed)
            }
            (Phase::Ending | Phase::Closed, _) => {
                Transition::reject(seq, violation(constants::ERR_SESSION_ENDING))
            }

            (Phase::Greeted | Phase::Querying, Payload::Welcome(_) | Payload::LookupReply(_)) => {
                Transition::reject(seq, unexpected(kind, self.state.phase))
            }
        }
    }

    /// Start a server-initiated End. Returns `None` when the session is already ending.
    pub fn close(&mut self, reason: impl Into<String>) -> Option<Message> {
        match self.state.phase {
            Phase::Ending | Phase::Closed => None,
            _ => {
                self.state.phase = Phase::Ending;
                self.state.pending_sequence_id = None;
                self.last_activity = Instant::now();
                self.last_sequence_id = self.last_sequence_id.wrapping_add(1);
                Some(Message::end(self.last_sequence_id, reason))
            }
        }
    }

    fn answer_lookup(&mut self, seq: u32, query: &LookupQuery, table: &LookupTable) -> Transition {
        self.state.phase = Phase::Querying;
        self.state.pending_sequence_id = Some(seq);

        match table.resolve(query) {
            Ok(record) => Transition::reply(
                ServerEvent::LookupAnswered { found: true },
                Message::lookup_reply(seq, record.clone()),
            ),
            Err(err) => Transition::reply(
                ServerEvent::LookupAnswered { found: false },
                Message::error(seq, err.reply_reason()),
            ),
        }
    }
}

/// What the client session learned from a server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Welcome received for our Hello
    Welcomed(String),
    /// Lookup answered with a record; `ack` must be sent before the next request
    Resolved { record: LookupRecord, ack: Message },
    /// Lookup answered with an `Error`; it is acknowledged like a record
    Rejected { reason: String, ack: Message },
    /// Server answered our End
    Closed,
    /// Server ended the session; `reply` is our closing End
    PeerEnded { reason: String, reply: Message },
}

/// Client side of the conversation. Sequence ids start at 1 and grow by one per request.
#[derive(Debug, Clone)]
pub struct ClientSession {
    state: SessionState,
    next_sequence_id: u32,
}

impl ClientSession {
    pub fn new(server: SocketAddr) -> Self {
        Self {
            state: SessionState::new(server),
            next_sequence_id: 1,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_closed(&self) -> bool {
        self.state.phase.is_closed()
    }

    /// Build the opening Hello
    pub fn hello(&mut self, greeting: impl Into<String>) -> Result<Message> {
        if self.state.phase != Phase::Init || self.state.pending_sequence_id.is_some() {
            return Err(violation(constants::ERR_ALREADY_GREETED));
        }
        let seq = self.issue();
        Ok(Message::hello(seq, greeting))
    }

    /// Build the next Lookup. Refused until the previous reply has been handled.
    pub fn lookup(&mut self, query: LookupQuery) -> Result<Message> {
        if !self.state.phase.accepts_lookup() {
            return Err(unexpected(MessageKind::Lookup, self.state.phase));
        }
        if self.state.pending_sequence_id.is_some() {
            return Err(violation(constants::ERR_AWAITING_ACK));
        }
        self.state.phase = Phase::Querying;
        let seq = self.issue();
        Ok(Message::lookup(seq, query))
    }

    /// Build our End and move to `Ending`
    pub fn end(&mut self, reason: impl Into<String>) -> Result<Message> {
        if !self.state.phase.accepts_lookup() || self.state.pending_sequence_id.is_some() {
            return Err(unexpected(MessageKind::End, self.state.phase));
        }
        self.state.phase = Phase::Ending;
        let seq = self.issue();
        Ok(Message::end(seq, reason))
    }

    /// Apply one server message
    pub fn handle(&mut self, msg: Message) -> Result<ClientEvent> {
        let kind = msg.kind();
        let seq = msg.sequence_id;

        match (self.state.phase, msg.payload) {
            (Phase::Closed, _) => Err(violation("Session already closed")),

            (Phase::Ending, Payload::End(_)) => {
                self.state.phase = Phase::Closed;
                self.state.pending_sequence_id = None;
                Ok(ClientEvent::Closed)
            }
            (_, Payload::End(reason)) => {
                self.state.phase = Phase::Closed;
                self.state.pending_sequence_id = None;
                Ok(ClientEvent::PeerEnded {
                    reason,
                    reply: Message::end(seq, constants::END_CLIENT_DONE),
                })
            }

            (Phase::Init, Payload::Welcome(banner)) => {
                self.settle(seq)?;
                self.state.phase = Phase::Greeted;
                Ok(ClientEvent::Welcomed(banner))
            }
            (Phase::Init, Payload::Error(reason)) => Err(violation(format!(
                "Greeting rejected by server: {reason}"
            ))),

            (Phase::Querying, Payload::LookupReply(record)) => {
                self.settle(seq)?;
                Ok(ClientEvent::Resolved {
                    record,
                    ack: Message::ack(seq),
                })
            }
            (Phase::Querying, Payload::Error(reason))
                if self.state.pending_sequence_id == Some(seq) =>
            {
                self.state.pending_sequence_id = None;
                Ok(ClientEvent::Rejected {
                    reason,
                    ack: Message::ack(seq),
                })
            }
            (_, Payload::Error(reason)) => {
                Err(violation(format!("Server reported an error: {reason}")))
            }

            (phase, _) => Err(unexpected(kind, phase)),
        }
    }

    fn issue(&mut self) -> u32 {
        let seq = self.next_sequence_id;
        self.next_sequence_id = self.next_sequence_id.wrapping_add(1);
        self.state.pending_sequence_id = Some(seq);
        seq
    }

    fn settle(&mut self, seq: u32) -> Result<()> {
        match self.state.pending_sequence_id {
            Some(pending) if pending == seq => {
                self.state.pending_sequence_id = None;
                Ok(())
            }
            Some(pending) => Err(ProtocolError::SequenceMismatch {
                expected: pending,
                received: seq,
            }),
            None => Err(violation(constants::ERR_UNEXPECTED_MESSAGE)),
        }
    }
}

fn violation(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::ProtocolViolation(reason.into())
}

fn unexpected(kind: MessageKind, phase: Phase) -> ProtocolError {
    violation(format!(
        "{} {kind} in phase {phase}",
        constants::ERR_UNEXPECTED_MESSAGE
    ))
}
