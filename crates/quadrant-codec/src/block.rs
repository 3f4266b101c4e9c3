use bytes::Bytes;
use cid::Cid;

use crate::content_id::digest_from_cid;
use crate::error::CodecError;
use crate::node::{decode_node, TreeNode};

/// Serialized node together with the identifier it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub data: Bytes,
}

impl Block {
    pub fn from_node(node: &TreeNode) -> Self {
        Self {
            cid: node.cid(),
            data: Bytes::from(node.to_bytes()),
        }
    }

    /// Decodes the block and checks that it hashes to its identifier.
    pub fn verify(&self) -> Result<TreeNode, CodecError> {
        verify_node(&self.cid, &self.data)
    }
}

/// Decodes `raw` and checks that its digest equals the one inside `cid`.
pub fn verify_node(cid: &Cid, raw: &[u8]) -> Result<TreeNode, CodecError> {
    let expected = digest_from_cid(cid)?;
    let node = decode_node(raw)?;
    if node.digest() != expected {
        return Err(CodecError::DigestMismatch {
            expected: expected.to_string(),
        });
    }
    Ok(node)
}
