use std::collections::HashSet;

use bytes::Bytes;
use quadrant_codec::{cid_from_digest, Block, CodecError, DataAvailabilityHeader};
use quadrant_core::{Nmt, NodeDigest, TreeError};
use quadrant_fec::ExtendedSquare;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::{NodeStore, StoreError};

/// Errors returned while committing a square.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("row {index}: {source}")]
    Row {
        index: usize,
        #[source]
        source: TreeError,
    },
    #[error("column {index}: {source}")]
    Column {
        index: usize,
        #[source]
        source: TreeError,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds one row or column tree from `(cell, is_parity)` pairs.
///
/// When `blocks` is given, every tree node is appended to it as a block.
pub fn build_axis<'a, I>(cells: I, blocks: Option<&mut Vec<Block>>) -> Result<NodeDigest, TreeError>
where
    I: IntoIterator<Item = (&'a [u8], bool)>,
{
    let mut tree = Nmt::default();
    for (cell, parity) in cells {
        if parity {
            tree.push_parity(cell)?;
        } else {
            tree.push(cell)?;
        }
    }
    match blocks {
        Some(out) => tree.root_with_visitor(|digest, node| {
            out.push(Block {
                cid: cid_from_digest(digest),
                data: Bytes::copy_from_slice(node),
            })
        }),
        None => tree.root(),
    }
}

/// Commits an extended square to a data-availability header.
#[derive(Debug, Clone, Copy, Default)]
pub struct DaHeaderBuilder;

impl DaHeaderBuilder {
    /// Computes row and column roots.
    pub fn build(&self, square: &ExtendedSquare) -> Result<DataAvailabilityHeader, BuildError> {
        let (row_roots, _) = split(map_lines(square.width(), |i| {
            build_axis(square.row(i), None)
                .map(|root| (root, Vec::new()))
                .map_err(|source| BuildError::Row { index: i, source })
        })?);
        let (column_roots, _) = split(map_lines(square.width(), |i| {
            build_axis(square.column(i), None)
                .map(|root| (root, Vec::new()))
                .map_err(|source| BuildError::Column { index: i, source })
        })?);
        Ok(DataAvailabilityHeader::new(row_roots, column_roots)?)
    }

    /// Computes roots and collects every tree node as a block, deduplicated.
    pub fn build_with_blocks(
        &self,
        square: &ExtendedSquare,
    ) -> Result<(DataAvailabilityHeader, Vec<Block>), BuildError> {
        let (row_roots, row_blocks) = split(map_lines(square.width(), |i| {
            let mut blocks = Vec::new();
            build_axis(square.row(i), Some(&mut blocks))
                .map(|root| (root, blocks))
                .map_err(|source| BuildError::Row { index: i, source })
        })?);
        let (column_roots, column_blocks) = split(map_lines(square.width(), |i| {
            let mut blocks = Vec::new();
            build_axis(square.column(i), Some(&mut blocks))
                .map(|root| (root, blocks))
                .map_err(|source| BuildError::Column { index: i, source })
        })?);

        // cells sit in both a row and a column tree
        let mut seen = HashSet::new();
        let blocks = row_blocks
            .into_iter()
            .chain(column_blocks)
            .flatten()
            .filter(|block| seen.insert(block.cid))
            .collect();
        let dah = DataAvailabilityHeader::new(row_roots, column_roots)?;
        Ok((dah, blocks))
    }
}

/// Builds every row and column tree, writes all nodes to `store`, and
/// returns the header.
pub async fn put_square<S: NodeStore + ?Sized>(
    store: &S,
    square: &ExtendedSquare,
) -> Result<DataAvailabilityHeader, BuildError> {
    let (dah, blocks) = DaHeaderBuilder.build_with_blocks(square)?;
    let count = blocks.len();
    debug!(width = square.width(), blocks = count, "writing square nodes");
    store.put_many(blocks).await?;
    info!(
        width = square.width(),
        blocks = count,
        dah = %hex::encode(&dah.hash()[..8]),
        "square committed"
    );
    Ok(dah)
}

fn split(lines: Vec<(NodeDigest, Vec<Block>)>) -> (Vec<NodeDigest>, Vec<Vec<Block>>) {
    lines.into_iter().unzip()
}

/// Runs `f` for every line index in order, across threads when enabled.
fn map_lines<T, F>(width: usize, f: F) -> Result<Vec<T>, BuildError>
where
    T: Send,
    F: Fn(usize) -> Result<T, BuildError> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..width).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..width).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use quadrant_codec::{cid_from_digest, decode_node};
    use quadrant_core::{NamespaceIdN, TreeError};
    use quadrant_fec::{ErasureEncoder, ExtendedSquare, OriginalSquare, ReedSolomonEncoder};

    use super::{build_axis, BuildError, DaHeaderBuilder};

    fn share(last: u8, fill: u8) -> Vec<u8> {
        let mut out = vec![0, 0, 0, 0, 0, 0, 0, last];
        out.resize(32, fill);
        out
    }

    fn square(count: u8) -> ExtendedSquare {
        let shares = (0..count).map(|i| share(i / 2 + 1, i)).collect();
        let original = OriginalSquare::from_shares(shares, 32).expect("original");
        ReedSolomonEncoder.extend(&original).expect("extend")
    }

    #[test]
    fn build_is_deterministic() {
        let sq = square(16);
        let a = DaHeaderBuilder.build(&sq).expect("build");
        let b = DaHeaderBuilder.build(&sq).expect("build");
        assert_eq!(a, b);
        assert_eq!(a.width(), 8);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn row_roots_span_real_namespaces_only() {
        let sq = square(16);
        let dah = DaHeaderBuilder.build(&sq).expect("build");
        // row 0 holds shares 0..4: namespaces 1, 1, 2, 2
        assert_eq!(dah.row_roots[0].range.min, NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 1]));
        assert_eq!(dah.row_roots[0].range.max, NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 2]));
        // bottom half is parity only
        assert!(dah.row_roots[4].range.is_sentinel());
        assert!(dah.column_roots[7].range.is_sentinel());
    }

    #[test]
    fn blocks_cover_every_tree_node_once() {
        let sq = square(4);
        let (dah, blocks) = DaHeaderBuilder.build_with_blocks(&sq).expect("build");
        assert_eq!(DaHeaderBuilder.build(&sq).expect("build"), dah);
        // width 4: at most 16 leaves shared by rows and columns, plus 8 trees
        // of 3 inner nodes each
        assert!(blocks.len() <= 16 + 8 * 3);
        let cids: HashSet<_> = blocks.iter().map(|b| b.cid).collect();
        assert_eq!(cids.len(), blocks.len());
        for root in dah.row_roots.iter().chain(&dah.column_roots) {
            assert!(cids.contains(&cid_from_digest(root)));
        }
        for block in &blocks {
            let node = decode_node(&block.data).expect("decode");
            assert_eq!(node.cid(), block.cid);
        }
    }

    #[test]
    fn unsorted_row_fails_whole_build() {
        let mut shares: Vec<Vec<u8>> = (0..4).map(|i| share(i + 1, 0)).collect();
        shares.swap(0, 1);
        let original = OriginalSquare::from_shares(shares, 32).expect("original");
        let sq = ReedSolomonEncoder.extend(&original).expect("extend");
        let err = DaHeaderBuilder.build(&sq).expect_err("unsorted row must fail");
        assert!(matches!(
            err,
            BuildError::Row {
                index: 0,
                source: TreeError::OutOfOrder { .. }
            }
        ));
    }

    #[test]
    fn build_axis_rejects_real_after_parity() {
        let parity = {
            let mut cell = NamespaceIdN::<8>::MAX.0.to_vec();
            cell.extend_from_slice(&[0; 32]);
            cell
        };
        let real = share(1, 0);
        let err = build_axis([(&parity[..], true), (&real[..], false)], None)
            .expect_err("real after parity must fail");
        assert!(matches!(err, TreeError::RealAfterParity { .. }));
    }
}
