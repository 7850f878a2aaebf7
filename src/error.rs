//! # Error Types
//!
//! Error handling for the lookup protocol.
//!
//! Every failure the client, the server or the plumbing around them can hit is a
//! variant of [`ProtocolError`]. Variants are grouped into the categories below so
//! the session loop can decide whether a failure ends the process, ends the
//! session, or simply becomes an `Error` reply.
//!
//! ## Error Categories
//! - **Config**: settings or lookup table could not be loaded (fatal)
//! - **Decode**: a datagram is not a well-formed message (answered with `Error`)
//! - **Protocol**: a well-formed message arrived out of sequence (answered with `Error`)
//! - **NotFound**: a lookup missed the table (answered with `Error`)
//! - **Transport**: socket failure (fatal to the session)
//!
//! ## Example Usage
//! ```rust
//! use lookup_protocol::error::{ErrorCategory, ProtocolError};
//!
//! let err = ProtocolError::NotFound {
//!     record_type: "A".into(),
//!     name: "www.nonexistent.com".into(),
//! };
//! assert_eq!(err.category(), ErrorCategory::NotFound);
//! assert!(!err.is_fatal());
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Reason strings carried in `Error` and `End` payloads.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Lookup errors
    pub const ERR_RECORD_NOT_FOUND: &str = "DNS record not found";

    /// Sequencing errors
    pub const ERR_EXPECTED_HELLO: &str = "Expected Hello before any other message";
    pub const ERR_ALREADY_GREETED: &str = "Session already greeted";
    pub const ERR_AWAITING_ACK: &str = "Awaiting Ack for the previous reply";
    pub const ERR_NOTHING_TO_ACK: &str = "No reply is awaiting an Ack";
    pub const ERR_SESSION_ENDING: &str = "Session is ending";
    pub const ERR_UNEXPECTED_MESSAGE: &str = "Unexpected message kind";

    /// Codec errors
    pub const ERR_MALFORMED_MESSAGE: &str = "Malformed message";
    pub const ERR_OVERSIZED_DATAGRAM: &str = "Datagram exceeds maximum size";

    /// Session limits
    pub const ERR_TOO_MANY_SESSIONS: &str = "Server is at its session limit";

    /// End reasons
    pub const END_CLIENT_DONE: &str = "All lookups sent";
    pub const END_SERVER_GOODBYE: &str = "Goodbye";
    pub const END_IDLE: &str = "No further requests";
}

/// Error taxonomy used by the session boundary to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Settings or lookup table failed to load
    Config,
    /// Datagram could not be decoded into a message
    Decode,
    /// Message was valid but not allowed in the current phase
    Protocol,
    /// Lookup query had no matching record
    NotFound,
    /// Socket level failure
    Transport,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Decode => "decode",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Transport => "transport",
        };
        f.write_str(name)
    }
}

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Lookup table load error: {0}")]
    LoadError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Datagram too large: {0} bytes")]
    OversizedDatagram(usize),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Sequence mismatch: expected {expected}, received {received}")]
    SequenceMismatch { expected: u32, received: u32 },

    #[error("No {record_type} record for {name}")]
    NotFound { record_type: String, name: String },

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

impl ProtocolError {
    /// Map this error onto the protocol's error taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProtocolError::ConfigError(_) | ProtocolError::LoadError(_) => ErrorCategory::Config,
            ProtocolError::DecodeError(_)
            | ProtocolError::EncodeError(_)
            | ProtocolError::OversizedDatagram(_) => ErrorCategory::Decode,
            ProtocolError::ProtocolViolation(_) | ProtocolError::SequenceMismatch { .. } => {
                ErrorCategory::Protocol
            }
            ProtocolError::NotFound { .. } => ErrorCategory::NotFound,
            ProtocolError::Io(_)
            | ProtocolError::TransportError(_)
            | ProtocolError::Timeout
            | ProtocolError::ConnectionClosed => ErrorCategory::Transport,
        }
    }

    /// Whether the error must stop the process (config) or the session (transport)
    /// instead of being answered with an `Error` reply
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Config | ErrorCategory::Transport
        )
    }

    /// Reason text sent to the peer when this error is answered with an `Error` reply
    pub fn reply_reason(&self) -> String {
        match self {
            ProtocolError::NotFound { .. } => constants::ERR_RECORD_NOT_FOUND.to_string(),
            ProtocolError::OversizedDatagram(_) => constants::ERR_OVERSIZED_DATAGRAM.to_string(),
            ProtocolError::DecodeError(detail) => {
                format!("{}: {detail}", constants::ERR_MALFORMED_MESSAGE)
            }
            ProtocolError::ProtocolViolation(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
