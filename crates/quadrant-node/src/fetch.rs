use quadrant_codec::{cid_from_digest, decode_node, verify_node, Cid, CodecError, TreeNode};
use quadrant_core::{Branch, NodeDigest, TreePath};
use thiserror::Error;

use crate::store::{NodeStore, StoreError};

/// Errors returned while fetching and walking stored tree nodes.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetching {cid} failed: {source}")]
    Store {
        cid: Cid,
        #[source]
        source: StoreError,
    },
    #[error("node {cid} is malformed: {source}")]
    Format {
        cid: Cid,
        #[source]
        source: CodecError,
    },
    #[error("leaf index {index} out of range for width {width}")]
    IndexOutOfRange { index: usize, width: usize },
    #[error("tree under {root} does not have width {width}")]
    ShapeMismatch { root: Cid, width: usize },
}

/// Fetches and decodes one node, optionally checking it against its id.
pub async fn fetch_node<S: NodeStore + ?Sized>(
    store: &S,
    cid: &Cid,
    verify: bool,
) -> Result<TreeNode, FetchError> {
    let raw = store.get(cid).await.map_err(|source| FetchError::Store {
        cid: *cid,
        source,
    })?;
    let decoded = if verify {
        verify_node(cid, &raw)
    } else {
        decode_node(&raw)
    };
    decoded.map_err(|source| FetchError::Format { cid: *cid, source })
}

/// Returns the share at `index` of the tree rooted at `root`.
pub async fn get_leaf<S: NodeStore + ?Sized>(
    store: &S,
    root: &NodeDigest,
    index: usize,
    width: usize,
) -> Result<Vec<u8>, FetchError> {
    let root_cid = cid_from_digest(root);
    if !width.is_power_of_two() {
        return Err(FetchError::ShapeMismatch {
            root: root_cid,
            width,
        });
    }
    if index >= width {
        return Err(FetchError::IndexOutOfRange { index, width });
    }

    let path = TreePath::from_index(index, width.trailing_zeros() as usize);
    let mut node = fetch_node(store, &root_cid, true).await?;
    for branch in path.branches() {
        let (left, right) = match &node {
            TreeNode::Inner { left, right } => (left, right),
            TreeNode::Leaf { .. } => {
                return Err(FetchError::ShapeMismatch {
                    root: root_cid,
                    width,
                })
            }
        };
        let next = match branch {
            Branch::Left => cid_from_digest(left),
            Branch::Right => cid_from_digest(right),
        };
        node = fetch_node(store, &next, true).await?;
    }
    node.share().ok_or(FetchError::ShapeMismatch {
        root: root_cid,
        width,
    })
}
