#![no_main]

use libfuzzer_sys::fuzz_target;
use quadrant_codec::{cid_from_bytes, decode_node, encode_node};

fuzz_target!(|data: &[u8]| {
    if let Ok(node) = decode_node(data) {
        assert_eq!(encode_node(&node), data);
        let _ = node.cid();
    }
    let _ = cid_from_bytes(data);
});
