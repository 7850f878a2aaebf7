//! Datagram codec.
//!
//! Each datagram carries exactly one UTF-8 JSON record:
//!
//! ```text
//! {"sequence_id": 2, "kind": "Lookup", "payload": {"record_type": "A", "name": "www.outlook.com"}}
//! ```
//!
//! The payload shape is checked against `kind` while decoding, so a `Lookup` whose
//! payload is a string is a decode error rather than a surprise for the session.
//! Datagrams larger than [`MAX_DATAGRAM_SIZE`] are rejected in both directions.

use crate::error::{ProtocolError, Result};
use crate::protocol::message::{LookupQuery, LookupRecord, Message, MessageKind, Payload};
use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

/// Max allowed datagram size in bytes
pub const MAX_DATAGRAM_SIZE: usize = 1024;

#[derive(Serialize)]
struct EnvelopeRef<'a, P: Serialize> {
    sequence_id: u32,
    kind: MessageKind,
    payload: &'a P,
}

#[derive(Deserialize)]
struct Envelope {
    sequence_id: u32,
    kind: MessageKind,
    payload: serde_json::Value,
}

/// Message codec bounded to a maximum datagram size
#[derive(Debug, Clone, Copy)]
pub struct MessageCodec {
    max_datagram_size: usize,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(MAX_DATAGRAM_SIZE)
    }
}

impl MessageCodec {
    pub fn new(max_datagram_size: usize) -> Self {
        Self { max_datagram_size }
    }

    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }

    /// Serialize a message into a single datagram
    pub fn encode_message(&self, msg: &Message) -> Result<Vec<u8>> {
        let kind = msg.kind();
        let sequence_id = msg.sequence_id;
        let bytes = match &msg.payload {
            Payload::Hello(text)
            | Payload::Welcome(text)
            | Payload::Error(text)
            | Payload::End(text) => to_json(sequence_id, kind, text),
            Payload::Lookup(query) => to_json(sequence_id, kind, query),
            Payload::LookupReply(record) => to_json(sequence_id, kind, record),
            Payload::Ack(echo) => to_json(sequence_id, kind, echo),
        }?;

        if bytes.len() > self.max_datagram_size {
            return Err(ProtocolError::OversizedDatagram(bytes.len()));
        }
        Ok(bytes)
    }

    /// Parse one datagram into a message
    pub fn decode_message(&self, datagram: &[u8]) -> Result<Message> {
        if datagram.len() > self.max_datagram_size {
            return Err(ProtocolError::OversizedDatagram(datagram.len()));
        }
        if datagram.is_empty() {
            return Err(ProtocolError::DecodeError("Empty datagram".to_string()));
        }

        let text = std::str::from_utf8(datagram)
            .map_err(|e| ProtocolError::DecodeError(format!("Invalid UTF-8: {e}")))?;
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| ProtocolError::DecodeError(e.to_string()))?;

        let payload = match envelope.kind {
            MessageKind::Hello => Payload::Hello(payload_as(envelope.kind, envelope.payload)?),
            MessageKind::Welcome => Payload::Welcome(payload_as(envelope.kind, envelope.payload)?),
            MessageKind::Lookup => {
                Payload::Lookup(payload_as::<LookupQuery>(envelope.kind, envelope.payload)?)
            }
            MessageKind::LookupReply => Payload::LookupReply(payload_as::<LookupRecord>(
                envelope.kind,
                envelope.payload,
            )?),
            MessageKind::Ack => Payload::Ack(payload_as(envelope.kind, envelope.payload)?),
            MessageKind::Error => Payload::Error(payload_as(envelope.kind, envelope.payload)?),
            MessageKind::End => Payload::End(payload_as(envelope.kind, envelope.payload)?),
        };

        Ok(Message::new(envelope.sequence_id, payload))
    }
}

fn to_json<P: Serialize>(sequence_id: u32, kind: MessageKind, payload: &P) -> Result<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef {
        sequence_id,
        kind,
        payload,
    })
    .map_err(|e| ProtocolError::EncodeError(e.to_string()))
}

fn payload_as<T: DeserializeOwned>(kind: MessageKind, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ProtocolError::DecodeError(format!("Invalid {kind} payload: {e}")))
}

/// Each call consumes the whole buffer: one buffer holds one datagram.
impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if src.is_empty() {
            return Ok(None);
        }
        let datagram = src.split();
        self.decode_message(&datagram).map(Some)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let bytes = self.encode_message(&item)?;
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}

/// Encode with the default datagram limit
pub fn encode(msg: &Message) -> Result<Vec<u8>> {
    MessageCodec::default().encode_message(msg)
}

/// Decode with the default datagram limit
pub fn decode(datagram: &[u8]) -> Result<Message> {
    MessageCodec::default().decode_message(datagram)
}
