//! Protocol messages.
//!
//! A [`Message`] is a caller-assigned `sequence_id` plus a [`Payload`]. The payload
//! variant doubles as the message kind, so a `Lookup` can only ever carry a
//! [`LookupQuery`] and an `Ack` can only ever carry the echoed sequence id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire-level kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Hello,
    Welcome,
    Lookup,
    LookupReply,
    Ack,
    Error,
    End,
}

impl MessageKind {
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Hello => "Hello",
            MessageKind::Welcome => "Welcome",
            MessageKind::Lookup => "Lookup",
            MessageKind::LookupReply => "LookupReply",
            MessageKind::Ack => "Ack",
            MessageKind::Error => "Error",
            MessageKind::End => "End",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lookup request: exact, case-sensitive `(record_type, name)` key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupQuery {
    #[serde(alias = "Type", alias = "type")]
    pub record_type: String,
    #[serde(alias = "Name")]
    pub name: String,
}

impl LookupQuery {
    pub fn new(record_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LookupQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.record_type, self.name)
    }
}

/// A record from the server's lookup table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupRecord {
    #[serde(alias = "Type", alias = "type")]
    pub record_type: String,
    #[serde(alias = "Name")]
    pub name: String,
    /// Opaque record data (an address, a mail host, ...)
    #[serde(alias = "Value")]
    pub value: String,
    #[serde(default, alias = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, alias = "Priority", skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl LookupRecord {
    pub fn new(
        record_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
            value: value.into(),
            ttl: None,
            priority: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Whether this record answers `query` (full, case-sensitive equality on both keys)
    #[inline]
    pub fn matches(&self, record_type: &str, name: &str) -> bool {
        self.record_type == record_type && self.name == name
    }
}

/// Kind-specific message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Client greeting text
    Hello(String),
    /// Server banner
    Welcome(String),
    Lookup(LookupQuery),
    LookupReply(LookupRecord),
    /// Echo of the acknowledged reply's sequence id
    Ack(u32),
    /// Human-readable reason
    Error(String),
    /// Closing reason
    End(String),
}

/// A single protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sequence_id: u32,
    pub payload: Payload,
}

impl Message {
    pub fn new(sequence_id: u32, payload: Payload) -> Self {
        Self {
            sequence_id,
            payload,
        }
    }

    pub fn hello(sequence_id: u32, greeting: impl Into<String>) -> Self {
        Self::new(sequence_id, Payload::Hello(greeting.into()))
    }

    pub fn welcome(sequence_id: u32, banner: impl Into<String>) -> Self {
        Self::new(sequence_id, Payload::Welcome(banner.into()))
    }

    pub fn lookup(sequence_id: u32, query: LookupQuery) -> Self {
        Self::new(sequence_id, Payload::Lookup(query))
    }

    pub fn lookup_reply(sequence_id: u32, record: LookupRecord) -> Self {
        Self::new(sequence_id, Payload::LookupReply(record))
    }

    /// Ack for the reply carrying `reply_sequence_id`; the id is both the Ack's own
    /// sequence id and its payload.
    pub fn ack(reply_sequence_id: u32) -> Self {
        Self::new(reply_sequence_id, Payload::Ack(reply_sequence_id))
    }

    pub fn error(sequence_id: u32, reason: impl Into<String>) -> Self {
        Self::new(sequence_id, Payload::Error(reason.into()))
    }

    pub fn end(sequence_id: u32, reason: impl Into<String>) -> Self {
        Self::new(sequence_id, Payload::End(reason.into()))
    }

    pub fn kind(&self) -> MessageKind {
        match self.payload {
            Payload::Hello(_) => MessageKind::Hello,
            Payload::Welcome(_) => MessageKind::Welcome,
            Payload::Lookup(_) => MessageKind::Lookup,
            Payload::LookupReply(_) => MessageKind::LookupReply,
            Payload::Ack(_) => MessageKind::Ack,
            Payload::Error(_) => MessageKind::Error,
            Payload::End(_) => MessageKind::End,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Hello(text)
            | Payload::Welcome(text)
            | Payload::Error(text)
            | Payload::End(text) => {
                write!(f, "#{} {} \"{}\"", self.sequence_id, self.kind(), text)
            }
            Payload::Lookup(query) => write!(f, "#{} Lookup {}", self.sequence_id, query),
            Payload::LookupReply(record) => write!(
                f,
                "#{} LookupReply {} {} = {}",
                self.sequence_id, record.record_type, record.name, record.value
            ),
            Payload::Ack(echo) => write!(f, "#{} Ack {}", self.sequence_id, echo),
        }
    }
}
