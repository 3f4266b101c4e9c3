use quadrant_core::hash::{sha256, sha256_parts};
use quadrant_core::{NodeDigest, NODE_DIGEST_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Fixed-length prefix of the raw header encoding: row and column counts.
const RAW_HEADER_LEN: usize = 8;

/// Row and column roots of an extended data square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAvailabilityHeader {
    /// One root per row, in row index order.
    pub row_roots: Vec<NodeDigest>,
    /// One root per column, in column index order.
    pub column_roots: Vec<NodeDigest>,
}

impl DataAvailabilityHeader {
    pub fn new(
        row_roots: Vec<NodeDigest>,
        column_roots: Vec<NodeDigest>,
    ) -> Result<Self, CodecError> {
        let dah = Self {
            row_roots,
            column_roots,
        };
        dah.validate()?;
        Ok(dah)
    }

    /// Square width (number of rows).
    pub fn width(&self) -> usize {
        self.row_roots.len()
    }

    /// Validates header invariants.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.row_roots.is_empty() {
            return Err(CodecError::InvalidHeader("header has no row roots"));
        }
        if self.row_roots.len() != self.column_roots.len() {
            return Err(CodecError::InvalidHeader(
                "row and column root counts differ",
            ));
        }
        Ok(())
    }

    /// Merkle root over all row roots followed by all column roots.
    pub fn hash(&self) -> [u8; 32] {
        let leaves: Vec<Vec<u8>> = self
            .row_roots
            .iter()
            .chain(self.column_roots.iter())
            .map(NodeDigest::to_bytes)
            .collect();
        merkle_root(&leaves)
    }

    /// Raw encoding: `u32 rows || u32 columns || row digests || column digests`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            RAW_HEADER_LEN + (self.row_roots.len() + self.column_roots.len()) * NODE_DIGEST_SIZE,
        );
        out.extend_from_slice(&(self.row_roots.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.column_roots.len() as u32).to_be_bytes());
        for digest in self.row_roots.iter().chain(self.column_roots.iter()) {
            out.extend_from_slice(&digest.to_bytes());
        }
        out
    }

    /// Parses and validates the raw encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < RAW_HEADER_LEN {
            return Err(CodecError::InvalidHeader("header shorter than its counts"));
        }
        let rows = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let cols = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let expected = rows
            .checked_add(cols)
            .and_then(|n| n.checked_mul(NODE_DIGEST_SIZE))
            .and_then(|n| n.checked_add(RAW_HEADER_LEN))
            .ok_or(CodecError::InvalidHeader("root counts overflow"))?;
        if bytes.len() != expected {
            return Err(CodecError::InvalidHeader(
                "header length does not match root counts",
            ));
        }

        let mut digests = bytes[RAW_HEADER_LEN..]
            .chunks_exact(NODE_DIGEST_SIZE)
            .map(NodeDigest::from_slice);
        let row_roots = digests.by_ref().take(rows).collect::<Result<Vec<_>, _>>()?;
        let column_roots = digests.collect::<Result<Vec<_>, _>>()?;
        Self::new(row_roots, column_roots)
    }
}

/// Encodes a header as CBOR after validation.
pub fn encode_dah_cbor(dah: &DataAvailabilityHeader) -> Result<Vec<u8>, CodecError> {
    dah.validate()?;
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(dah, &mut bytes).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decodes and validates a CBOR header.
pub fn decode_dah_cbor(bytes: &[u8]) -> Result<DataAvailabilityHeader, CodecError> {
    let dah: DataAvailabilityHeader =
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    dah.validate()?;
    Ok(dah)
}

/// RFC 6962 binary Merkle root; the tree splits at the largest power of two
/// below the item count.
fn merkle_root(items: &[Vec<u8>]) -> [u8; 32] {
    match items.len() {
        0 => sha256(&[]),
        1 => sha256_parts(&[&[0x00][..], &items[0][..]]),
        n => {
            let split = split_point(n);
            let left = merkle_root(&items[..split]);
            let right = merkle_root(&items[split..]);
            sha256_parts(&[&[0x01][..], &left[..], &right[..]])
        }
    }
}

fn split_point(n: usize) -> usize {
    debug_assert!(n > 1);
    n.next_power_of_two() / 2
}
