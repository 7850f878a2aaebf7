//! Property-based tests using proptest
//!
//! These tests check codec and lookup invariants across randomly generated
//! messages, keys and byte strings.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use lookup_protocol::core::codec::{decode, encode, MAX_DATAGRAM_SIZE};
use lookup_protocol::error::ProtocolError;
use lookup_protocol::protocol::lookup::LookupTable;
use lookup_protocol::protocol::message::{LookupQuery, LookupRecord, Message, Payload};
use lookup_protocol::protocol::session::ServerSession;
use proptest::prelude::*;

fn text() -> impl Strategy<Value = String> {
    "[ -~]{0,64}"
}

fn payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        text().prop_map(Payload::Hello),
        text().prop_map(Payload::Welcome),
        (text(), text()).prop_map(|(t, n)| Payload::Lookup(LookupQuery::new(t, n))),
        (text(), text(), text(), any::<Option<u32>>(), any::<Option<u16>>()).prop_map(
            |(t, n, v, ttl, priority)| {
                Payload::LookupReply(LookupRecord {
                    record_type: t,
                    name: n,
                    value: v,
                    ttl,
                    priority,
                })
            }
        ),
        any::<u32>().prop_map(Payload::Ack),
        text().prop_map(Payload::Error),
        text().prop_map(Payload::End),
    ]
}

// Property: every message that fits in a datagram decodes back to itself
proptest! {
    #[test]
    fn prop_message_survives_the_wire(sequence_id in any::<u32>(), payload in payload()) {
        let msg = Message::new(sequence_id, payload);
        let bytes = encode(&msg).expect("small messages fit in one datagram");
        prop_assert!(bytes.len() <= MAX_DATAGRAM_SIZE);
        prop_assert_eq!(decode(&bytes).expect("decode"), msg);
    }
}

// Property: arbitrary bytes never panic the decoder
proptest! {
    #[test]
    fn prop_decode_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        match decode(&data) {
            Ok(_) => prop_assert!(data.len() <= MAX_DATAGRAM_SIZE),
            Err(ProtocolError::OversizedDatagram(n)) => prop_assert!(n > MAX_DATAGRAM_SIZE),
            Err(ProtocolError::DecodeError(_)) => {}
            Err(other) => prop_assert!(false, "Unexpected error: {other:?}"),
        }
    }
}

// Property: lookups match on the exact (type, name) pair only
proptest! {
    #[test]
    fn prop_lookup_is_exact(
        record_type in "[A-Z]{1,5}",
        name in "[a-z]{1,12}\\.[a-z]{2,3}",
        value in "[0-9.]{7,15}",
    ) {
        let table = LookupTable::from_records(vec![
            LookupRecord::new(record_type.clone(), name.clone(), value.clone()),
        ]);

        prop_assert_eq!(&table.query(&record_type, &name).unwrap().value, &value);
        prop_assert!(table.query(&record_type.to_lowercase(), &name).is_err());
        prop_assert!(table.query(&record_type, &name.to_uppercase()).is_err());
        let prefix = &name[..name.len() - 1];
        prop_assert!(table.query(&record_type, prefix).is_err());
    }
}

// Property: the server echoes the request's sequence id on Welcome
proptest! {
    #[test]
    fn prop_welcome_echoes_sequence_id(sequence_id in any::<u32>()) {
        let mut session = ServerSession::new("127.0.0.1:1".parse().unwrap(), "banner");
        let transition = session.handle(Message::hello(sequence_id, "hi"), &LookupTable::empty());
        prop_assert_eq!(transition.reply, Some(Message::welcome(sequence_id, "banner")));
    }
}
