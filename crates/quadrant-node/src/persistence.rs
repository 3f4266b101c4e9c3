use std::fs;
use std::path::Path;

use bytes::Bytes;
use quadrant_codec::{
    cid_from_bytes, decode_dah_cbor, encode_dah_cbor, verify_node, Block, CodecError,
    DataAvailabilityHeader,
};
use quadrant_core::hash::blake3_32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::MemoryStore;

/// Current snapshot layout.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Errors returned by store and header persistence helpers.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
    #[error("failed to decode snapshot: {0}")]
    Decode(String),
    #[error("failed to read snapshot file: {0}")]
    Read(std::io::Error),
    #[error("failed to write snapshot file: {0}")]
    Write(std::io::Error),
    #[error("snapshot checksum mismatch")]
    Checksum,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid block in snapshot: {0}")]
    InvalidBlock(#[from] CodecError),
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    #[serde(with = "serde_bytes")]
    cid: Vec<u8>,
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
}

/// On-disk form of a [`MemoryStore`].
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    version: u8,
    #[serde(with = "serde_bytes")]
    checksum: Vec<u8>,
    blocks: Vec<SnapshotEntry>,
}

impl StoreSnapshot {
    /// Captures every block currently held by `store`, ordered by id.
    pub fn capture(store: &MemoryStore) -> Self {
        let mut blocks: Vec<SnapshotEntry> = store
            .blocks()
            .into_iter()
            .map(|block| SnapshotEntry {
                cid: block.cid.to_bytes(),
                data: block.data.to_vec(),
            })
            .collect();
        blocks.sort_by(|a, b| a.cid.cmp(&b.cid));
        Self {
            version: SNAPSHOT_VERSION,
            checksum: checksum(&blocks).to_vec(),
            blocks,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Checks version and checksum, re-hashes every block and rebuilds the store.
    pub fn restore(self) -> Result<MemoryStore, PersistenceError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }
        if checksum(&self.blocks)[..] != self.checksum[..] {
            return Err(PersistenceError::Checksum);
        }
        let blocks = self
            .blocks
            .into_iter()
            .map(|entry| {
                let cid = cid_from_bytes(&entry.cid)?;
                verify_node(&cid, &entry.data)?;
                Ok(Block {
                    cid,
                    data: Bytes::from(entry.data),
                })
            })
            .collect::<Result<Vec<_>, PersistenceError>>()?;
        Ok(MemoryStore::from_blocks(blocks))
    }
}

fn checksum(blocks: &[SnapshotEntry]) -> [u8; 32] {
    let mut buf = Vec::new();
    for entry in blocks {
        buf.extend_from_slice(&(entry.cid.len() as u32).to_be_bytes());
        buf.extend_from_slice(&entry.cid);
        buf.extend_from_slice(&(entry.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&entry.data);
    }
    blake3_32(&buf)
}

/// Encodes a snapshot of `store` to CBOR bytes.
pub fn encode_snapshot(store: &MemoryStore) -> Result<Vec<u8>, PersistenceError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(&StoreSnapshot::capture(store), &mut out)
        .map_err(|e| PersistenceError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decodes and verifies a CBOR snapshot into a fresh store.
pub fn decode_snapshot(bytes: &[u8]) -> Result<MemoryStore, PersistenceError> {
    let snapshot: StoreSnapshot = ciborium::de::from_reader(bytes)
        .map_err(|e| PersistenceError::Decode(e.to_string()))?;
    snapshot.restore()
}

/// Saves a store snapshot to the given path, replacing it atomically.
pub fn save_store_to_path(
    path: impl AsRef<Path>,
    store: &MemoryStore,
) -> Result<(), PersistenceError> {
    write_atomic(path.as_ref(), &encode_snapshot(store)?)
}

/// Loads a store snapshot from the given path.
pub fn load_store_from_path(path: impl AsRef<Path>) -> Result<MemoryStore, PersistenceError> {
    let bytes = fs::read(path.as_ref()).map_err(PersistenceError::Read)?;
    decode_snapshot(&bytes)
}

/// Loads a store snapshot if the file exists; otherwise returns an empty store.
pub fn load_store_or_default(path: impl AsRef<Path>) -> Result<MemoryStore, PersistenceError> {
    if !path.as_ref().exists() {
        return Ok(MemoryStore::new());
    }
    load_store_from_path(path)
}

/// Saves a header as CBOR.
pub fn save_dah_to_path(
    path: impl AsRef<Path>,
    dah: &DataAvailabilityHeader,
) -> Result<(), PersistenceError> {
    write_atomic(path.as_ref(), &encode_dah_cbor(dah)?)
}

/// Loads and validates a CBOR header.
pub fn load_dah_from_path(
    path: impl AsRef<Path>,
) -> Result<DataAvailabilityHeader, PersistenceError> {
    let bytes = fs::read(path.as_ref()).map_err(PersistenceError::Read)?;
    Ok(decode_dah_cbor(&bytes)?)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(PersistenceError::Write)?;
    fs::rename(&tmp, path).map_err(PersistenceError::Write)
}

#[cfg(test)]
mod tests {
    use quadrant_codec::{Block, TreeNode};

    use crate::store::MemoryStore;

    use super::{
        decode_snapshot, encode_snapshot, load_store_from_path, load_store_or_default,
        save_store_to_path, PersistenceError, StoreSnapshot, SNAPSHOT_VERSION,
    };

    fn sample_store() -> MemoryStore {
        let blocks = (1..=3u8).map(|i| {
            let mut share = vec![0, 0, 0, 0, 0, 0, 0, i];
            share.extend_from_slice(b"snapshot leaf");
            let node = TreeNode::leaf_from_share(&share).expect("leaf");
            Block::from_node(&node)
        });
        MemoryStore::from_blocks(blocks)
    }

    #[test]
    fn snapshot_round_trips_blocks() {
        let store = sample_store();
        let encoded = encode_snapshot(&store).expect("snapshot should encode");
        let restored = decode_snapshot(&encoded).expect("snapshot should decode");
        assert_eq!(restored.len(), 3);
        for block in store.blocks() {
            assert!(restored.contains(&block.cid));
        }
    }

    #[test]
    fn tampered_checksum_is_rejected() {
        let mut snapshot = StoreSnapshot::capture(&sample_store());
        snapshot.checksum[0] ^= 0xFF;
        assert!(matches!(snapshot.restore(), Err(PersistenceError::Checksum)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut snapshot = StoreSnapshot::capture(&sample_store());
        snapshot.version = SNAPSHOT_VERSION + 1;
        assert!(matches!(
            snapshot.restore(),
            Err(PersistenceError::UnsupportedVersion(v)) if v == SNAPSHOT_VERSION + 1
        ));
    }

    #[test]
    fn block_that_does_not_match_its_id_is_rejected() {
        let mut snapshot = StoreSnapshot::capture(&sample_store());
        let last = snapshot.blocks[0].data.len() - 1;
        snapshot.blocks[0].data[last] ^= 0x01;
        snapshot.checksum = super::checksum(&snapshot.blocks).to_vec();
        assert!(matches!(
            snapshot.restore(),
            Err(PersistenceError::InvalidBlock(_))
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            decode_snapshot(&[0xFF, 0x00, 0x13]),
            Err(PersistenceError::Decode(_))
        ));
    }

    #[test]
    fn file_helpers_round_trip_and_default() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("store.cbor");
        save_store_to_path(&file, &sample_store()).expect("snapshot should be saved");
        assert!(!file.with_extension("tmp").exists());
        let loaded = load_store_from_path(&file).expect("snapshot should load");
        assert_eq!(loaded.len(), 3);

        let missing = dir.path().join("missing.cbor");
        let defaulted = load_store_or_default(&missing).expect("missing file should default");
        assert!(defaulted.is_empty());
    }
}
