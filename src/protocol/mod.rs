//! # Protocol Layer
//!
//! Messages, the server's lookup table and the session state machine.
//!
//! ## Exchange
//! ```text
//! client                         server
//!   Hello ───────────────────────▶
//!         ◀─────────────────────── Welcome
//!   Lookup ──────────────────────▶            (repeated)
//!         ◀─────────────────────── LookupReply | Error
//!   Ack ─────────────────────────▶
//!   End ─────────────────────────▶
//!         ◀─────────────────────── End
//! ```
//!
//! Every step is one request and at most one reply. Replies echo the request's
//! `sequence_id`; Acks echo the reply's.

pub mod lookup;
pub mod message;
pub mod session;
pub mod state;
