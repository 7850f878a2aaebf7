//! # Lookup Protocol
//!
//! A stop-and-wait request/reply protocol over UDP: a client greets a server,
//! asks it to resolve a series of `(record_type, name)` keys against a static
//! record table, acknowledges every answer, and closes the session with an End
//! exchange.
//!
//! ## Layers
//! - [`core`]: one message per UTF-8 JSON datagram, 1024 bytes max
//! - [`protocol`]: messages, lookup table and the session state machine
//! - [`transport`]: datagram transports (UDP and in-memory)
//! - [`service`]: server loop and client driver
//! - [`config`], [`error`], [`utils`]: settings, errors, logging, metrics, timeouts
//!
//! ## Example
//! ```rust,no_run
//! use lookup_protocol::config::Settings;
//! use lookup_protocol::service::LookupClient;
//!
//! # async fn demo() -> lookup_protocol::error::Result<()> {
//! let settings = Settings::load("Setting.json")?;
//! let report = LookupClient::bind(&settings).await?.run().await?;
//! for record in report.found() {
//!     println!("{} {} = {}", record.record_type, record.name, record.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is retransmitted: a lost datagram leaves the waiting side blocked
//! unless a receive timeout is configured.

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::core::codec::{decode, encode, MessageCodec, MAX_DATAGRAM_SIZE};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::message::{LookupQuery, LookupRecord, Message, MessageKind, Payload};
