//! Session phases.
//!
//! ```text
//!  Init ──Hello/Welcome──▶ Greeted ──Lookup──▶ Querying ◀─┐
//!                             │                  │  │      │ Lookup/Reply/Ack
//!                             │                  │  └──────┘
//!                             └──────End─────────┴──▶ Ending ──End──▶ Closed
//! ```
//!
//! Both roles share [`SessionState`]; the role-specific rules live in
//! [`crate::protocol::session`].

use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No greeting exchanged yet
    #[default]
    Init,
    /// Hello/Welcome completed, no lookup yet
    Greeted,
    /// At least one lookup issued
    Querying,
    /// This side sent End and waits for the peer's End
    Ending,
    /// Both End messages exchanged; transport may be released
    Closed,
}

impl Phase {
    /// Whether a Lookup may be issued/processed in this phase
    pub fn accepts_lookup(self) -> bool {
        matches!(self, Phase::Greeted | Phase::Querying)
    }

    pub fn is_closed(self) -> bool {
        self == Phase::Closed
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Per-peer conversational state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: Phase,
    /// Sequence id of the message that still waits for its answer
    /// (a reply on the client, an Ack on the server)
    pub pending_sequence_id: Option<u32>,
    pub peer: SocketAddr,
}

impl SessionState {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            phase: Phase::Init,
            pending_sequence_id: None,
            peer,
        }
    }
}
