//! Wire codec of the namespaced data-availability layer.
//!
//! Covers the tree-node byte layout, content identifiers, verified blocks,
//! the data-availability header, and the share/message layout.

pub mod block;
pub mod content_id;
pub mod dah;
pub mod error;
pub mod node;
pub mod share;

pub use block::{verify_node, Block};
pub use content_id::{
    cid_from_bytes, cid_from_digest, digest_from_cid, NMT_CODEC, NMT_MULTIHASH_CODE,
};
pub use dah::{decode_dah_cbor, encode_dah_cbor, DataAvailabilityHeader};
pub use error::CodecError;
pub use node::{decode_node, encode_node, NodeKind, TreeNode};
pub use share::{Message, MSG_SHARE_SIZE, SHARE_SIZE};

/// Content identifier type used throughout the workspace.
pub use ::cid::Cid;
