//! Core primitives of the namespaced data-availability layer.
//!
//! Includes namespace/range/digest types, the namespace flagger, the
//! namespaced digest builder, the namespaced Merkle tree, tree paths, hash
//! helpers, and base errors.

pub mod error;
pub mod flagger;
pub mod hash;
pub mod hasher;
pub mod path;
pub mod tree;
pub mod types;

pub use flagger::{MinMaxFlagger, NamespaceFlagger};
pub use hasher::{NamespacedHasher, INNER_PREFIX, LEAF_PREFIX};
pub use path::{Branch, TreePath};
pub use tree::{NamespacedMerkleTree, Nmt, TreeError};
pub use types::{
    NamespaceId, NamespaceIdN, NamespaceRange, NamespaceRangeN, NodeDigest, NodeDigestN,
    EVIDENCE_NAMESPACE, HASH_SIZE, INTERMEDIATE_STATE_ROOTS_NAMESPACE, MAX_RESERVED_NAMESPACE,
    NAMESPACE_SIZE, NODE_DIGEST_SIZE, PARITY_SHARES_NAMESPACE, TAIL_PADDING_NAMESPACE,
    TX_NAMESPACE,
};

/// Digest builder with the default flagger and namespace width.
pub type Sha256NamespacedHasher = NamespacedHasher<MinMaxFlagger, NAMESPACE_SIZE>;
