use cid::Cid;
use quadrant_core::hasher::{inner_node_bytes, leaf_node_bytes};
use quadrant_core::{
    MinMaxFlagger, NamespaceId, NodeDigest, Sha256NamespacedHasher, INNER_PREFIX, LEAF_PREFIX,
    NAMESPACE_SIZE, NODE_DIGEST_SIZE,
};

use crate::content_id::cid_from_digest;
use crate::error::CodecError;

/// Type marker carried by the first byte of every serialized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeKind {
    Leaf = LEAF_PREFIX,
    Inner = INNER_PREFIX,
}

impl TryFrom<u8> for NodeKind {
    type Error = CodecError;

    fn try_from(marker: u8) -> Result<Self, Self::Error> {
        match marker {
            LEAF_PREFIX => Ok(Self::Leaf),
            INNER_PREFIX => Ok(Self::Inner),
            other => Err(CodecError::UnknownMarker(other)),
        }
    }
}

/// Decoded tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Share stored at a leaf.
    Leaf { namespace: NamespaceId, data: Vec<u8> },
    /// Digests of both children.
    Inner { left: NodeDigest, right: NodeDigest },
}

impl TreeNode {
    /// Builds a leaf from a namespaced share.
    pub fn leaf_from_share(share: &[u8]) -> Result<Self, CodecError> {
        let namespace = NamespaceId::from_prefix(share)?;
        Ok(Self::Leaf {
            namespace,
            data: share[NAMESPACE_SIZE..].to_vec(),
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Leaf { .. } => NodeKind::Leaf,
            Self::Inner { .. } => NodeKind::Inner,
        }
    }

    /// Wire bytes: `[marker][namespace || data]` or `[marker][left || right]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Leaf { .. } => {
                let share = self.share().unwrap_or_default();
                leaf_node_bytes(&share)
            }
            Self::Inner { left, right } => inner_node_bytes(left, right),
        }
    }

    /// Full share (`namespace || data`) of a leaf.
    pub fn share(&self) -> Option<Vec<u8>> {
        match self {
            Self::Leaf { namespace, data } => {
                let mut out = Vec::with_capacity(NAMESPACE_SIZE + data.len());
                out.extend_from_slice(namespace.as_bytes());
                out.extend_from_slice(data);
                Some(out)
            }
            Self::Inner { .. } => None,
        }
    }

    /// Recomputes the node digest from its serialized bytes.
    ///
    /// Parity leaves carry the all-ones namespace, whose leaf flag equals
    /// the coded-mode sentinel, so no coded flag is needed here.
    pub fn digest(&self) -> NodeDigest {
        let mut hasher = Sha256NamespacedHasher::new(MinMaxFlagger);
        hasher.write(&self.to_bytes());
        hasher.sum()
    }

    /// Content identifier of this node.
    pub fn cid(&self) -> Cid {
        cid_from_digest(&self.digest())
    }
}

/// Parses raw node bytes into a typed node.
pub fn decode_node(raw: &[u8]) -> Result<TreeNode, CodecError> {
    let (&marker, body) = raw
        .split_first()
        .ok_or(CodecError::Format("empty node"))?;
    match NodeKind::try_from(marker)? {
        NodeKind::Leaf => {
            if body.len() < NAMESPACE_SIZE {
                return Err(CodecError::Format("leaf shorter than its namespace"));
            }
            TreeNode::leaf_from_share(body)
        }
        NodeKind::Inner => {
            if body.len() != 2 * NODE_DIGEST_SIZE {
                return Err(CodecError::Format(
                    "inner node must carry exactly two child digests",
                ));
            }
            Ok(TreeNode::Inner {
                left: NodeDigest::from_slice(&body[..NODE_DIGEST_SIZE])?,
                right: NodeDigest::from_slice(&body[NODE_DIGEST_SIZE..])?,
            })
        }
    }
}

/// Serializes a node to its wire bytes.
pub fn encode_node(node: &TreeNode) -> Vec<u8> {
    node.to_bytes()
}
