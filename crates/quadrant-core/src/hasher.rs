//! Namespaced digest builder.
//!
//! One [`NamespacedHasher`] computes the digest of one tree node at a time:
//! callers `write` the serialized node (type marker first), call `sum`, then
//! `reset` before the next node. Instances are never shared between
//! concurrent tree builds.

use crate::flagger::NamespaceFlagger;
use crate::hash::sha256;
use crate::types::{NamespaceRangeN, NodeDigestN, HASH_SIZE};

/// Type marker of a serialized leaf node.
pub const LEAF_PREFIX: u8 = 0x00;
/// Type marker of a serialized inner node.
pub const INNER_PREFIX: u8 = 0x01;

/// Serialized leaf node: `LEAF_PREFIX || namespace || data`.
pub fn leaf_node_bytes(share: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + share.len());
    out.push(LEAF_PREFIX);
    out.extend_from_slice(share);
    out
}

/// Serialized inner node: `INNER_PREFIX || left_digest || right_digest`.
pub fn inner_node_bytes<const N: usize>(left: &NodeDigestN<N>, right: &NodeDigestN<N>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 2 * NodeDigestN::<N>::SIZE);
    out.push(INNER_PREFIX);
    out.extend_from_slice(&left.to_bytes());
    out.extend_from_slice(&right.to_bytes());
    out
}

/// Accumulating digest builder producing `sha256(node_bytes) || flag`.
#[derive(Debug, Clone)]
pub struct NamespacedHasher<F, const N: usize> {
    flagger: F,
    data: Vec<u8>,
    coded: bool,
}

impl<F: NamespaceFlagger<N>, const N: usize> NamespacedHasher<F, N> {
    pub fn new(flagger: F) -> Self {
        Self {
            flagger,
            data: Vec::new(),
            coded: false,
        }
    }

    /// Digest width: base hash plus the `min || max` flag.
    pub const fn size() -> usize {
        HASH_SIZE + 2 * N
    }

    /// Marks subsequent leaves as erasure-coded parity data.
    ///
    /// Coded mode survives `reset`; callers switch it off explicitly.
    pub fn set_coded_mode(&mut self, coded: bool) {
        self.coded = coded;
    }

    pub fn coded_mode(&self) -> bool {
        self.coded
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Clears accumulated bytes so the instance can hash the next node.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Digest of the accumulated node.
    ///
    /// # Panics
    ///
    /// Panics if nothing was written, or if an inner node does not carry
    /// exactly two child digests. Both are programming errors.
    pub fn sum(&self) -> NodeDigestN<N> {
        let marker = *self
            .data
            .first()
            .expect("NamespacedHasher::sum called before any write");
        let body = &self.data[1..];
        let range = if marker == LEAF_PREFIX {
            if self.coded {
                NamespaceRangeN::SENTINEL
            } else {
                self.flagger.leaf_flag(body)
            }
        } else {
            let size = Self::size();
            assert_eq!(
                body.len(),
                2 * size,
                "inner node must carry exactly two child digests"
            );
            let left = self.flagger.node_flag(&body[..size]);
            let right = self.flagger.node_flag(&body[size..]);
            self.flagger.union(&left, &right)
        };
        NodeDigestN {
            hash: sha256(&self.data),
            range,
        }
    }

    /// Convenience wrapper hashing one leaf share.
    pub fn hash_leaf(&mut self, share: &[u8]) -> NodeDigestN<N> {
        self.reset();
        self.write(&[LEAF_PREFIX]);
        self.write(share);
        self.sum()
    }

    /// Convenience wrapper hashing one inner node.
    pub fn hash_inner(&mut self, left: &NodeDigestN<N>, right: &NodeDigestN<N>) -> NodeDigestN<N> {
        self.reset();
        self.write(&inner_node_bytes(left, right));
        self.sum()
    }
}
