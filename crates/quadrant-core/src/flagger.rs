use crate::types::{NamespaceIdN, NamespaceRangeN, HASH_SIZE};

/// Computes the namespace-range flag appended to node digests.
///
/// Implementations are pure; inputs shorter than the namespace width are
/// caller bugs and may panic.
pub trait NamespaceFlagger<const N: usize> {
    /// Flag of a leaf whose payload starts with its `N`-byte namespace.
    fn leaf_flag(&self, payload: &[u8]) -> NamespaceRangeN<N>;

    /// Flag embedded in the trailing `2 * N` bytes of a child digest.
    fn node_flag(&self, digest: &[u8]) -> NamespaceRangeN<N>;

    /// Flag of an inner node covering both children.
    fn union(&self, left: &NamespaceRangeN<N>, right: &NamespaceRangeN<N>) -> NamespaceRangeN<N>;
}

/// Min/max flagger used by every namespaced tree in this workspace.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MinMaxFlagger;

impl<const N: usize> NamespaceFlagger<N> for MinMaxFlagger {
    fn leaf_flag(&self, payload: &[u8]) -> NamespaceRangeN<N> {
        assert!(
            payload.len() >= N,
            "leaf payload of {} bytes is shorter than the {N}-byte namespace",
            payload.len()
        );
        let mut raw = [0_u8; N];
        raw.copy_from_slice(&payload[..N]);
        NamespaceRangeN::leaf(NamespaceIdN(raw))
    }

    fn node_flag(&self, digest: &[u8]) -> NamespaceRangeN<N> {
        assert_eq!(
            digest.len(),
            HASH_SIZE + 2 * N,
            "child digest has unexpected width"
        );
        let flag = &digest[HASH_SIZE..];
        let mut min = [0_u8; N];
        let mut max = [0_u8; N];
        min.copy_from_slice(&flag[..N]);
        max.copy_from_slice(&flag[N..]);
        NamespaceRangeN {
            min: NamespaceIdN(min),
            max: NamespaceIdN(max),
        }
    }

    fn union(&self, left: &NamespaceRangeN<N>, right: &NamespaceRangeN<N>) -> NamespaceRangeN<N> {
        left.union(right)
    }
}
