use std::cmp::{max, min};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Default namespace identifier width in bytes.
pub const NAMESPACE_SIZE: usize = 8;
/// Base digest width (SHA-256).
pub const HASH_SIZE: usize = 32;
/// Serialized width of a node digest with the default namespace width.
pub const NODE_DIGEST_SIZE: usize = HASH_SIZE + 2 * NAMESPACE_SIZE;

/// Fixed-width namespace identifier, ordered lexicographically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespaceIdN<const N: usize>(pub [u8; N]);

/// Namespace identifier with the default width.
pub type NamespaceId = NamespaceIdN<NAMESPACE_SIZE>;

impl<const N: usize> NamespaceIdN<N> {
    /// Smallest possible namespace.
    pub const MIN: Self = Self([0x00; N]);
    /// All-bits-set namespace, reserved for parity shares.
    pub const MAX: Self = Self([0xFF; N]);

    /// Reads a namespace from a slice of exactly `N` bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let raw: [u8; N] = bytes.try_into().map_err(|_| CoreError::InvalidLength {
            what: "namespace id",
            expected: N,
            got: bytes.len(),
        })?;
        Ok(Self(raw))
    }

    /// Reads the namespace prefix of a namespaced share.
    pub fn from_prefix(share: &[u8]) -> Result<Self, CoreError> {
        if share.len() < N {
            return Err(CoreError::InvalidLength {
                what: "namespaced share",
                expected: N,
                got: share.len(),
            });
        }
        Self::from_slice(&share[..N])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for the reserved parity namespace.
    pub fn is_parity(&self) -> bool {
        *self == Self::MAX
    }
}

impl<const N: usize> fmt::Debug for NamespaceIdN<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamespaceId({})", hex::encode(self.0))
    }
}

impl<const N: usize> fmt::Display for NamespaceIdN<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl<const N: usize> FromStr for NamespaceIdN<N> {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.trim().trim_start_matches("0x"))
            .map_err(|_| CoreError::InvalidInput("namespace id must be hex"))?;
        Self::from_slice(&raw)
    }
}

impl<const N: usize> Serialize for NamespaceIdN<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de, const N: usize> Deserialize<'de> for NamespaceIdN<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Self::from_slice(&raw).map_err(serde::de::Error::custom)
    }
}

/// Namespace reserved for transaction shares.
pub const TX_NAMESPACE: NamespaceId = NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 1]);
/// Namespace reserved for intermediate state roots.
pub const INTERMEDIATE_STATE_ROOTS_NAMESPACE: NamespaceId = NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 2]);
/// Namespace reserved for evidence.
pub const EVIDENCE_NAMESPACE: NamespaceId = NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 3]);
/// Upper bound of the protocol-reserved namespace range.
pub const MAX_RESERVED_NAMESPACE: NamespaceId = NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 0xFF]);
/// Namespace of shares padding the original square up to its width.
pub const TAIL_PADDING_NAMESPACE: NamespaceId =
    NamespaceIdN([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
/// Namespace assigned to erasure-coded parity shares.
pub const PARITY_SHARES_NAMESPACE: NamespaceId = NamespaceId::MAX;

/// Inclusive namespace interval covered by a subtree.
///
/// Parity leaves carry [`NamespaceRangeN::SENTINEL`], which contains no real
/// namespace and acts as the identity of [`NamespaceRangeN::union`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceRangeN<const N: usize> {
    pub min: NamespaceIdN<N>,
    pub max: NamespaceIdN<N>,
}

/// Namespace range with the default width.
pub type NamespaceRange = NamespaceRangeN<NAMESPACE_SIZE>;

impl<const N: usize> NamespaceRangeN<N> {
    /// Flag carried by parity leaves; never matches a namespace query.
    pub const SENTINEL: Self = Self {
        min: NamespaceIdN::MAX,
        max: NamespaceIdN::MAX,
    };

    /// Degenerate range of a single leaf.
    pub fn leaf(namespace: NamespaceIdN<N>) -> Self {
        Self {
            min: namespace,
            max: namespace,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// Whether `namespace` lies in `[min, max]`. The sentinel contains nothing.
    pub fn contains(&self, namespace: &NamespaceIdN<N>) -> bool {
        !self.is_sentinel() && self.min <= *namespace && *namespace <= self.max
    }

    /// Component-wise union that ignores sentinel ranges.
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_sentinel(), other.is_sentinel()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Self {
                min: min(self.min, other.min),
                max: max(self.max, other.max),
            },
        }
    }

    /// Serialized form `min || max`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * N);
        out.extend_from_slice(&self.min.0);
        out.extend_from_slice(&self.max.0);
        out
    }

    /// Parses `min || max` from exactly `2 * N` bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != 2 * N {
            return Err(CoreError::InvalidLength {
                what: "namespace range",
                expected: 2 * N,
                got: bytes.len(),
            });
        }
        let range = Self {
            min: NamespaceIdN::from_slice(&bytes[..N])?,
            max: NamespaceIdN::from_slice(&bytes[N..])?,
        };
        if range.min > range.max {
            return Err(CoreError::InvalidInput("namespace range min exceeds max"));
        }
        Ok(range)
    }
}

impl<const N: usize> fmt::Debug for NamespaceRangeN<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Digest of one tree node: `base_hash || min_namespace || max_namespace`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeDigestN<const N: usize> {
    pub hash: [u8; HASH_SIZE],
    pub range: NamespaceRangeN<N>,
}

/// Node digest with the default namespace width.
pub type NodeDigest = NodeDigestN<NAMESPACE_SIZE>;

impl<const N: usize> NodeDigestN<N> {
    /// Serialized digest width.
    pub const SIZE: usize = HASH_SIZE + 2 * N;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&self.range.min.0);
        out.extend_from_slice(&self.range.max.0);
        out
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != Self::SIZE {
            return Err(CoreError::InvalidLength {
                what: "node digest",
                expected: Self::SIZE,
                got: bytes.len(),
            });
        }
        let mut hash = [0_u8; HASH_SIZE];
        hash.copy_from_slice(&bytes[..HASH_SIZE]);
        Ok(Self {
            hash,
            range: NamespaceRangeN::from_slice(&bytes[HASH_SIZE..])?,
        })
    }

    pub fn min_namespace(&self) -> NamespaceIdN<N> {
        self.range.min
    }

    pub fn max_namespace(&self) -> NamespaceIdN<N> {
        self.range.max
    }
}

impl<const N: usize> fmt::Debug for NodeDigestN<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeDigest({} {:?})", hex::encode(self.hash), self.range)
    }
}

impl<const N: usize> fmt::Display for NodeDigestN<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl<const N: usize> Serialize for NodeDigestN<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de, const N: usize> Deserialize<'de> for NodeDigestN<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Self::from_slice(&raw).map_err(serde::de::Error::custom)
    }
}
