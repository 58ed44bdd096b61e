#![no_main]
use libfuzzer_sys::fuzz_target;
use ttime_proto::{Message, Tag};

fuzz_target!(|data: &[u8]| {
    // Any input either decodes or fails cleanly; decoded messages re-encode
    // to the same bytes.
    if let Ok(msg) = Message::decode(data) {
        let _ = msg.get(Tag::CERT);
        let _ = msg.require_u64(Tag::MIDP);
        let _ = msg.nested(Tag::SREP);
        if let Ok(encoded) = msg.encode() {
            assert_eq!(Message::decode(&encoded).as_ref(), Ok(&msg));
        }
    }
    let _ = ttime_proto::request::parse_request(data);
});
