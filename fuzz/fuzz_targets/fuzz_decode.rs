#![no_main]

use libfuzzer_sys::fuzz_target;
use lookup_protocol::core::codec::decode;

fuzz_target!(|data: &[u8]| {
    // Any datagram must either decode or fail cleanly, and whatever decodes must encode again
    if let Ok(msg) = decode(data) {
        let _ = lookup_protocol::core::codec::encode(&msg);
    }
});
