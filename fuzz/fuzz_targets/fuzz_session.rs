#![no_main]

use libfuzzer_sys::fuzz_target;
use lookup_protocol::core::codec::decode;
use lookup_protocol::protocol::lookup::LookupTable;
use lookup_protocol::protocol::message::LookupRecord;
use lookup_protocol::protocol::session::ServerSession;

fuzz_target!(|data: &[u8]| {
    // Feed a stream of datagrams (split on newlines) through one server session
    let table = LookupTable::from_records(vec![LookupRecord::new("A", "www.outlook.com", "192.168.1.1")]);
    let mut session = ServerSession::new(([127, 0, 0, 1], 9).into(), "banner");
    for datagram in data.split(|b| *b == b'\n') {
        if let Ok(msg) = decode(datagram) {
            let _ = session.handle(msg, &table);
        }
    }
});
