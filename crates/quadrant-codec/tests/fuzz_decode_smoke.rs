use std::panic;

use quadrant_codec::dah::DataAvailabilityHeader;
use quadrant_codec::share::parse_messages;
use quadrant_codec::{cid_from_bytes, decode_dah_cbor, decode_node, encode_node, TreeNode};
use quadrant_core::{NamespaceIdN, NamespaceRange, NodeDigest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sample_inner() -> TreeNode {
    TreeNode::Inner {
        left: NodeDigest {
            hash: [0x11; 32],
            range: NamespaceRange::leaf(NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 4])),
        },
        right: NodeDigest {
            hash: [0x22; 32],
            range: NamespaceRange::leaf(NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 9])),
        },
    }
}

#[test]
fn fuzz_like_random_inputs_do_not_panic_decoders() {
    let mut rng = StdRng::seed_from_u64(0xBAD5EED);
    for i in 0..2000_usize {
        let len = (i * 73) % 512;
        let mut data = vec![0_u8; len];
        rng.fill(data.as_mut_slice());
        if let Some(first) = data.first_mut() {
            // keep half the cases on a valid marker to reach the body parsers
            *first = (i % 4) as u8;
        }

        let node = panic::catch_unwind(|| decode_node(&data));
        assert!(node.is_ok(), "decode_node panicked at case {i}");

        let cid = panic::catch_unwind(|| cid_from_bytes(&data));
        assert!(cid.is_ok(), "cid_from_bytes panicked at case {i}");

        let dah = panic::catch_unwind(|| DataAvailabilityHeader::from_bytes(&data));
        assert!(dah.is_ok(), "DataAvailabilityHeader::from_bytes panicked at case {i}");

        let cbor = panic::catch_unwind(|| decode_dah_cbor(&data));
        assert!(cbor.is_ok(), "decode_dah_cbor panicked at case {i}");

        let shares = vec![data.clone()];
        let messages = panic::catch_unwind(|| parse_messages(&shares));
        assert!(messages.is_ok(), "parse_messages panicked at case {i}");
    }
}

#[test]
fn fuzz_like_mutations_of_valid_nodes_do_not_panic() {
    let mut bytes = encode_node(&sample_inner());
    for i in 0..512_usize {
        let idx = i % bytes.len();
        bytes[idx] ^= (i as u8).wrapping_mul(31).wrapping_add(1);
        let data = bytes.clone();

        let decoded = panic::catch_unwind(|| decode_node(&data));
        assert!(decoded.is_ok(), "decode_node panicked for mutated node at case {i}");
        if let Ok(Ok(node)) = decoded {
            assert_eq!(encode_node(&node), data, "decode must be canonical at case {i}");
        }
    }
}
