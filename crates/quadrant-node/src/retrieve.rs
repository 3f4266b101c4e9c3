use std::time::Duration;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use quadrant_codec::{cid_from_digest, Cid, CodecError, DataAvailabilityHeader, TreeNode};
use quadrant_core::{Branch, NamespaceId, NodeDigest, TreePath};
use thiserror::Error;
use tracing::{debug, info};

use crate::cancel::CancelSignal;
use crate::config::RetrieverConfig;
use crate::fetch::{fetch_node, FetchError};
use crate::store::{NodeStore, StoreError};

/// Target namespace outside the interval covered by a header.
///
/// The row index is the nearest boundary row, reported for diagnostics only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("namespace {namespace} is below minimum namespace of header (nearest row {row})")]
    BelowMinimum { namespace: NamespaceId, row: usize },
    #[error("namespace {namespace} exceeds maximum namespace of header (nearest row {row})")]
    ExceedsMaximum { namespace: NamespaceId, row: usize },
}

/// Errors returned by namespace retrieval.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("malformed node {cid} in row {row}: {source}")]
    Format {
        row: usize,
        cid: Cid,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("namespace {namespace} within range but not found{}", row_suffix(.row))]
    NotFoundInRange {
        namespace: NamespaceId,
        row: Option<usize>,
    },
    #[error("fetching {cid} for row {row} failed: {source}")]
    Fetch {
        row: usize,
        cid: Cid,
        #[source]
        source: StoreError,
    },
    #[error("retrieval cancelled")]
    Cancelled,
    #[error("invalid retriever configuration: {0}")]
    Config(&'static str),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" in row {r}")).unwrap_or_default()
}

impl RetrieveError {
    fn from_fetch(row: usize, err: FetchError) -> Self {
        match err {
            FetchError::Store { cid, source } => Self::Fetch { row, cid, source },
            FetchError::Format { cid, source } => Self::Format { row, cid, source },
            FetchError::ShapeMismatch { root, .. } => Self::Format {
                row,
                cid: root,
                source: CodecError::Format("unexpected tree shape"),
            },
            // only produced by index walks, which retrieval never performs
            FetchError::IndexOutOfRange { .. } => Self::Config("leaf index out of range"),
        }
    }
}

/// Rows whose root range contains `namespace`, in row order.
pub fn select_rows(
    namespace: &NamespaceId,
    dah: &DataAvailabilityHeader,
) -> Result<Vec<usize>, RetrieveError> {
    let mut bounds: Option<(NamespaceId, NamespaceId)> = None;
    let mut rows = Vec::new();
    for (i, root) in dah.row_roots.iter().enumerate() {
        if root.range.is_sentinel() {
            continue;
        }
        bounds = Some(match bounds {
            None => (root.min_namespace(), root.max_namespace()),
            Some((min, max)) => (min.min(root.min_namespace()), max.max(root.max_namespace())),
        });
        if root.range.contains(namespace) {
            rows.push(i);
        }
    }

    let Some((min, max)) = bounds else {
        return Err(RetrieveError::NotFoundInRange {
            namespace: *namespace,
            row: None,
        });
    };
    if *namespace < min {
        return Err(RangeError::BelowMinimum {
            namespace: *namespace,
            row: 0,
        }
        .into());
    }
    if *namespace > max {
        return Err(RangeError::ExceedsMaximum {
            namespace: *namespace,
            row: dah.row_roots.len() - 1,
        }
        .into());
    }
    if rows.is_empty() {
        return Err(RetrieveError::NotFoundInRange {
            namespace: *namespace,
            row: None,
        });
    }
    Ok(rows)
}

/// Walks content-addressed row trees to collect the shares of one namespace.
#[derive(Debug)]
pub struct RangeRetriever<S> {
    store: S,
    config: RetrieverConfig,
}

impl<S: NodeStore> RangeRetriever<S> {
    pub fn new(store: S, config: RetrieverConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Returns every share of `namespace`, in row order then leaf order.
    pub async fn retrieve(
        &self,
        namespace: &NamespaceId,
        dah: &DataAvailabilityHeader,
    ) -> Result<Vec<Vec<u8>>, RetrieveError> {
        self.retrieve_with_cancel(namespace, dah, &CancelSignal::never())
            .await
    }

    /// Like [`Self::retrieve`], aborting with [`RetrieveError::Cancelled`]
    /// when `cancel` fires or the configured deadline passes.
    pub async fn retrieve_with_cancel(
        &self,
        namespace: &NamespaceId,
        dah: &DataAvailabilityHeader,
        cancel: &CancelSignal,
    ) -> Result<Vec<Vec<u8>>, RetrieveError> {
        self.config.validate().map_err(RetrieveError::Config)?;
        if cancel.is_cancelled() || self.config.deadline == Some(Duration::ZERO) {
            return Err(RetrieveError::Cancelled);
        }

        let deadline = self.config.deadline;
        let expired = async move {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%namespace, "retrieval cancelled");
                Err(RetrieveError::Cancelled)
            }
            _ = expired => {
                debug!(%namespace, ?deadline, "retrieval deadline passed");
                Err(RetrieveError::Cancelled)
            }
            res = self.collect(namespace, dah) => res,
        }
    }

    async fn collect(
        &self,
        namespace: &NamespaceId,
        dah: &DataAvailabilityHeader,
    ) -> Result<Vec<Vec<u8>>, RetrieveError> {
        let rows = select_rows(namespace, dah)?;
        debug!(%namespace, candidates = rows.len(), "selected rows");

        let verify = self.config.verify_digests;
        let per_row: Vec<Vec<Vec<u8>>> = stream::iter(rows.iter().copied())
            .map(|row| collect_row(&self.store, namespace, row, &dah.row_roots[row], verify))
            .buffered(self.config.max_concurrent_rows)
            .try_collect()
            .await?;

        let shares: Vec<Vec<u8>> = per_row.into_iter().flatten().collect();
        if shares.is_empty() {
            return Err(RetrieveError::NotFoundInRange {
                namespace: *namespace,
                row: None,
            });
        }
        info!(%namespace, rows = rows.len(), shares = shares.len(), "namespace retrieved");
        Ok(shares)
    }
}

/// Retrieves the shares of `namespace` with default settings and an
/// optional deadline.
pub async fn retrieve<S: NodeStore + ?Sized>(
    namespace: &NamespaceId,
    dah: &DataAvailabilityHeader,
    store: &S,
    deadline: Option<Duration>,
) -> Result<Vec<Vec<u8>>, RetrieveError> {
    let config = RetrieverConfig {
        deadline,
        ..RetrieverConfig::default()
    };
    RangeRetriever::new(store, config).retrieve(namespace, dah).await
}

/// First leaf of a namespace within one row tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStart {
    /// Linear leaf index, derived from the descent path.
    pub index: usize,
    /// Full share (`namespace || data`) at `index`.
    pub share: Vec<u8>,
    // right siblings passed on the way down, nearest last
    siblings: Vec<NodeDigest>,
}

async fn fetch_in_row<S: NodeStore + ?Sized>(
    store: &S,
    digest: &NodeDigest,
    row: usize,
    verify: bool,
) -> Result<TreeNode, RetrieveError> {
    fetch_node(store, &cid_from_digest(digest), verify)
        .await
        .map_err(|err| RetrieveError::from_fetch(row, err))
}

/// Descends from `root` to the leftmost leaf of `namespace`.
///
/// At each inner node the child whose range contains the target is taken,
/// left first. Fails with [`RetrieveError::NotFoundInRange`] when no child
/// covers the target or the reached leaf carries another namespace.
pub async fn find_starting_index<S: NodeStore + ?Sized>(
    store: &S,
    namespace: &NamespaceId,
    row: usize,
    root: &NodeDigest,
    verify: bool,
) -> Result<RowStart, RetrieveError> {
    let absent = || RetrieveError::NotFoundInRange {
        namespace: *namespace,
        row: Some(row),
    };

    let mut siblings = Vec::new();
    let mut path = TreePath::new();
    let mut node = fetch_in_row(store, root, row, verify).await?;
    loop {
        match node {
            TreeNode::Inner { left, right } => {
                let next = if left.range.contains(namespace) {
                    siblings.push(right);
                    path.push(Branch::Left);
                    left
                } else if right.range.contains(namespace) {
                    path.push(Branch::Right);
                    right
                } else {
                    return Err(absent());
                };
                node = fetch_in_row(store, &next, row, verify).await?;
            }
            TreeNode::Leaf {
                namespace: found,
                data,
            } => {
                if found != *namespace {
                    debug!(row, %namespace, %found, "leaf differs from claimed namespace");
                    return Err(absent());
                }
                return Ok(RowStart {
                    index: path.index(),
                    share: share_bytes(found, data),
                    siblings,
                });
            }
        }
    }
}

/// Locates the first leaf of `namespace` under `root`, then walks right
/// while leaves keep that namespace.
///
/// The next leaf in order is the leftmost leaf of the nearest pending right
/// sibling, whose namespace is the sibling's range minimum. The walk
/// therefore stops without fetching the first non-matching leaf.
async fn collect_row<S: NodeStore + ?Sized>(
    store: &S,
    namespace: &NamespaceId,
    row: usize,
    root: &NodeDigest,
    verify: bool,
) -> Result<Vec<Vec<u8>>, RetrieveError> {
    let RowStart {
        index: start,
        share,
        siblings: mut pending,
    } = find_starting_index(store, namespace, row, root, verify).await?;

    let mut shares = vec![share];
    while let Some(sibling) = pending.pop() {
        if sibling.range.is_sentinel() || sibling.min_namespace() != *namespace {
            break;
        }
        let mut node = fetch_in_row(store, &sibling, row, verify).await?;
        loop {
            match node {
                TreeNode::Inner { left, right } => {
                    pending.push(right);
                    node = fetch_in_row(store, &left, row, verify).await?;
                }
                TreeNode::Leaf {
                    namespace: found,
                    data,
                } => {
                    if found != *namespace {
                        return Err(RetrieveError::Format {
                            row,
                            cid: cid_from_digest(&sibling),
                            source: CodecError::Format(
                                "subtree minimum disagrees with its leftmost leaf",
                            ),
                        });
                    }
                    shares.push(share_bytes(found, data));
                    break;
                }
            }
        }
    }

    debug!(row, start, count = shares.len(), "collected namespace run");
    Ok(shares)
}

fn share_bytes(namespace: NamespaceId, data: Vec<u8>) -> Vec<u8> {
    let mut share = Vec::with_capacity(namespace.as_bytes().len() + data.len());
    share.extend_from_slice(namespace.as_bytes());
    share.extend_from_slice(&data);
    share
}
