use thiserror::Error;

use crate::flagger::{MinMaxFlagger, NamespaceFlagger};
use crate::hasher::{inner_node_bytes, leaf_node_bytes, NamespacedHasher};
use crate::types::{NamespaceIdN, NodeDigestN, NAMESPACE_SIZE};

/// Errors returned while pushing leaves or computing a tree root.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("leaf of {got} bytes is shorter than the {expected}-byte namespace")]
    InvalidLeaf { expected: usize, got: usize },
    #[error("namespace {current} pushed after larger namespace {previous}")]
    OutOfOrder { previous: String, current: String },
    #[error("real leaf with namespace {namespace} pushed after parity data")]
    RealAfterParity { namespace: String },
    #[error("tree has no leaves")]
    EmptyTree,
    #[error("leaf count {0} is not a power of two")]
    NotPowerOfTwo(usize),
}

#[derive(Debug, Clone)]
struct PushedLeaf {
    share: Vec<u8>,
    coded: bool,
}

/// Binary Merkle tree whose node digests carry namespace ranges.
///
/// Leaves are shares (`namespace || data`). Real leaves must arrive in
/// non-decreasing namespace order; parity leaves may only trail them.
#[derive(Debug, Clone)]
pub struct NamespacedMerkleTree<F, const N: usize> {
    hasher: NamespacedHasher<F, N>,
    leaves: Vec<PushedLeaf>,
    last_real: Option<NamespaceIdN<N>>,
    seen_parity: bool,
}

/// Tree with the default flagger and namespace width.
pub type Nmt = NamespacedMerkleTree<MinMaxFlagger, NAMESPACE_SIZE>;

impl Default for Nmt {
    fn default() -> Self {
        Self::new(MinMaxFlagger)
    }
}

impl<F: NamespaceFlagger<N>, const N: usize> NamespacedMerkleTree<F, N> {
    pub fn new(flagger: F) -> Self {
        Self {
            hasher: NamespacedHasher::new(flagger),
            leaves: Vec::new(),
            last_real: None,
            seen_parity: false,
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Appends a real leaf, enforcing namespace order.
    pub fn push(&mut self, share: &[u8]) -> Result<(), TreeError> {
        let namespace =
            NamespaceIdN::<N>::from_prefix(share).map_err(|_| TreeError::InvalidLeaf {
                expected: N,
                got: share.len(),
            })?;
        if self.seen_parity {
            return Err(TreeError::RealAfterParity {
                namespace: namespace.to_string(),
            });
        }
        if let Some(previous) = self.last_real {
            if namespace < previous {
                return Err(TreeError::OutOfOrder {
                    previous: previous.to_string(),
                    current: namespace.to_string(),
                });
            }
        }
        self.last_real = Some(namespace);
        self.leaves.push(PushedLeaf {
            share: share.to_vec(),
            coded: false,
        });
        Ok(())
    }

    /// Appends an erasure-coded leaf, hashed in coded mode.
    pub fn push_parity(&mut self, share: &[u8]) -> Result<(), TreeError> {
        if share.len() < N {
            return Err(TreeError::InvalidLeaf {
                expected: N,
                got: share.len(),
            });
        }
        self.seen_parity = true;
        self.leaves.push(PushedLeaf {
            share: share.to_vec(),
            coded: true,
        });
        Ok(())
    }

    /// Computes the root digest.
    pub fn root(&mut self) -> Result<NodeDigestN<N>, TreeError> {
        self.root_with_visitor(|_, _| {})
    }

    /// Computes the root digest, handing every node to `visit` as
    /// `(digest, serialized node)`, bottom-up and level by level so the
    /// root is visited last.
    pub fn root_with_visitor<V>(&mut self, mut visit: V) -> Result<NodeDigestN<N>, TreeError>
    where
        V: FnMut(&NodeDigestN<N>, &[u8]),
    {
        let count = self.leaves.len();
        if count == 0 {
            return Err(TreeError::EmptyTree);
        }
        if !count.is_power_of_two() {
            return Err(TreeError::NotPowerOfTwo(count));
        }

        let mut level = Vec::with_capacity(count);
        for leaf in &self.leaves {
            let node = leaf_node_bytes(&leaf.share);
            self.hasher.set_coded_mode(leaf.coded);
            self.hasher.reset();
            self.hasher.write(&node);
            let digest = self.hasher.sum();
            visit(&digest, &node);
            level.push(digest);
        }
        self.hasher.set_coded_mode(false);

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len() / 2);
            for pair in level.chunks_exact(2) {
                let node = inner_node_bytes(&pair[0], &pair[1]);
                self.hasher.reset();
                self.hasher.write(&node);
                let digest = self.hasher.sum();
                visit(&digest, &node);
                next.push(digest);
            }
            level = next;
        }
        self.hasher.reset();
        Ok(level[0])
    }
}
