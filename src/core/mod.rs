//! # Core Protocol Components
//!
//! Low-level datagram framing.
//!
//! This module turns protocol messages into single UTF-8 datagrams and back.
//!
//! ## Components
//! - **Codec**: JSON text codec, usable directly or as a tokio-util `Encoder`/`Decoder`
//!
//! ## Wire Format
//! ```text
//! {"sequence_id": <u32>, "kind": <Hello|Welcome|Lookup|LookupReply|Ack|Error|End>, "payload": <kind-specific>}
//! ```
//!
//! ## Limits
//! - Maximum datagram size: 1024 bytes, enforced on encode and decode
//! - A message must fit in one datagram; there is no reassembly

pub mod codec;
