use cid::Cid;
use multihash::Multihash;
use quadrant_core::{NodeDigest, NODE_DIGEST_SIZE};

use crate::error::CodecError;

/// Multicodec of a serialized namespaced tree node.
pub const NMT_CODEC: u64 = 0x7700;
/// Multihash code of a namespaced node digest.
pub const NMT_MULTIHASH_CODE: u64 = 0x7701;

/// Largest digest a multihash may carry here.
const MAX_DIGEST: usize = 64;

/// Wraps a node digest as a version-1 content identifier.
pub fn cid_from_digest(digest: &NodeDigest) -> Cid {
    let mh = Multihash::<MAX_DIGEST>::wrap(NMT_MULTIHASH_CODE, &digest.to_bytes())
        .expect("48-byte node digest always fits the multihash buffer");
    Cid::new_v1(NMT_CODEC, mh)
}

/// Extracts the node digest from an identifier, checking codec and width.
pub fn digest_from_cid(cid: &Cid) -> Result<NodeDigest, CodecError> {
    if cid.codec() != NMT_CODEC {
        return Err(CodecError::InvalidCid(format!(
            "unexpected codec {:#x}",
            cid.codec()
        )));
    }
    let mh = cid.hash();
    if mh.code() != NMT_MULTIHASH_CODE {
        return Err(CodecError::InvalidCid(format!(
            "unexpected multihash code {:#x}",
            mh.code()
        )));
    }
    if mh.digest().len() != NODE_DIGEST_SIZE {
        return Err(CodecError::InvalidCid(format!(
            "digest of {} bytes, expected {NODE_DIGEST_SIZE}",
            mh.digest().len()
        )));
    }
    Ok(NodeDigest::from_slice(mh.digest())?)
}

/// Parses the binary identifier form.
pub fn cid_from_bytes(bytes: &[u8]) -> Result<Cid, CodecError> {
    let cid = Cid::try_from(bytes).map_err(|e| CodecError::InvalidCid(e.to_string()))?;
    digest_from_cid(&cid)?;
    Ok(cid)
}

#[cfg(test)]
mod tests {
    use super::{cid_from_bytes, cid_from_digest, digest_from_cid, NMT_CODEC};
    use crate::error::CodecError;
    use cid::Cid;
    use multihash::Multihash;
    use quadrant_core::{NamespaceIdN, NamespaceRange, NodeDigest};

    fn digest() -> NodeDigest {
        NodeDigest {
            hash: [0xAB; 32],
            range: NamespaceRange {
                min: NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 3]),
                max: NamespaceIdN([0, 0, 0, 0, 0, 0, 0, 9]),
            },
        }
    }

    #[test]
    fn digest_survives_cid_wrapping() {
        let cid = cid_from_digest(&digest());
        assert_eq!(cid.codec(), NMT_CODEC);
        assert_eq!(digest_from_cid(&cid).expect("valid cid"), digest());
        let parsed = cid_from_bytes(&cid.to_bytes()).expect("binary form parses");
        assert_eq!(parsed, cid);
    }

    #[test]
    fn rejects_foreign_codec_and_hash() {
        let mh = Multihash::<64>::wrap(0x12, &[0; 32]).expect("wrap");
        let foreign = Cid::new_v1(0x55, mh);
        assert!(matches!(
            digest_from_cid(&foreign),
            Err(CodecError::InvalidCid(_))
        ));

        let wrong_code = Cid::new_v1(NMT_CODEC, mh);
        assert!(matches!(
            digest_from_cid(&wrong_code),
            Err(CodecError::InvalidCid(_))
        ));
    }

    #[test]
    fn rejects_wrong_digest_width() {
        let mh = Multihash::<64>::wrap(super::NMT_MULTIHASH_CODE, &[0; 40]).expect("wrap");
        let short = Cid::new_v1(NMT_CODEC, mh);
        assert!(matches!(
            digest_from_cid(&short),
            Err(CodecError::InvalidCid(_))
        ));
        assert!(cid_from_bytes(&[0x01, 0x02]).is_err());
    }
}
