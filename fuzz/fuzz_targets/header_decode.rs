#![no_main]

use libfuzzer_sys::fuzz_target;
use quadrant_codec::share::parse_messages;
use quadrant_codec::{decode_dah_cbor, DataAvailabilityHeader};

fuzz_target!(|data: &[u8]| {
    let _ = DataAvailabilityHeader::from_bytes(data);
    let _ = decode_dah_cbor(data);
    let shares: Vec<Vec<u8>> = data.chunks(32).map(<[u8]>::to_vec).collect();
    let _ = parse_messages(&shares);
});
