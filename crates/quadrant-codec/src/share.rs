use quadrant_core::{NamespaceId, NAMESPACE_SIZE, PARITY_SHARES_NAMESPACE, TAIL_PADDING_NAMESPACE};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Default share size in bytes.
pub const SHARE_SIZE: usize = 256;
/// Payload bytes per share once the namespace prefix is taken.
pub const MSG_SHARE_SIZE: usize = SHARE_SIZE - NAMESPACE_SIZE;

/// Longest unsigned varint accepted for a message length.
const MAX_VARINT_LEN: usize = 10;

/// Namespaced application message laid out over one or more shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub namespace: NamespaceId,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

fn check_share_size(share_size: usize) -> Result<(), CodecError> {
    if share_size <= NAMESPACE_SIZE {
        return Err(CodecError::InvalidShare(
            "share size must exceed the namespace size",
        ));
    }
    Ok(())
}

/// Splits sorted messages into namespaced shares of `share_size` bytes.
///
/// Each message is prefixed with its varint length and starts on a fresh
/// share; the last chunk of a message is zero padded.
pub fn split_messages(messages: &[Message], share_size: usize) -> Result<Vec<Vec<u8>>, CodecError> {
    check_share_size(share_size)?;
    if messages.windows(2).any(|w| w[0].namespace > w[1].namespace) {
        return Err(CodecError::InvalidShare("messages must be sorted by namespace"));
    }

    let chunk_len = share_size - NAMESPACE_SIZE;
    let mut shares = Vec::new();
    for message in messages {
        if message.namespace == PARITY_SHARES_NAMESPACE
            || message.namespace == TAIL_PADDING_NAMESPACE
        {
            return Err(CodecError::InvalidShare(
                "messages may not use a reserved trailing namespace",
            ));
        }
        let mut payload = Vec::with_capacity(MAX_VARINT_LEN + message.data.len());
        put_uvarint(&mut payload, message.data.len() as u64);
        payload.extend_from_slice(&message.data);

        for chunk in payload.chunks(chunk_len) {
            let mut share = Vec::with_capacity(share_size);
            share.extend_from_slice(message.namespace.as_bytes());
            share.extend_from_slice(chunk);
            share.resize(share_size, 0);
            shares.push(share);
        }
    }
    Ok(shares)
}

/// Share filling unused cells of the original square.
pub fn tail_padding_share(share_size: usize) -> Vec<u8> {
    let mut share = vec![0; share_size.max(NAMESPACE_SIZE)];
    share[..NAMESPACE_SIZE].copy_from_slice(TAIL_PADDING_NAMESPACE.as_bytes());
    share
}

/// Namespace prefix of a share.
pub fn share_namespace(share: &[u8]) -> Result<NamespaceId, CodecError> {
    NamespaceId::from_prefix(share)
        .map_err(|_| CodecError::InvalidShare("share shorter than its namespace"))
}

/// Reassembles messages from shares in square order.
///
/// Tail padding and parity shares are skipped. Shares of one namespace must
/// be contiguous, as [`split_messages`] lays them out.
pub fn parse_messages(shares: &[Vec<u8>]) -> Result<Vec<Message>, CodecError> {
    let mut messages = Vec::new();
    let mut i = 0;
    while i < shares.len() {
        let namespace = share_namespace(&shares[i])?;
        if namespace == TAIL_PADDING_NAMESPACE || namespace == PARITY_SHARES_NAMESPACE {
            i += 1;
            continue;
        }

        let first = &shares[i][NAMESPACE_SIZE..];
        let (len, used) = read_uvarint(first)
            .ok_or(CodecError::InvalidShare("message length prefix is malformed"))?;
        let len = usize::try_from(len)
            .map_err(|_| CodecError::InvalidShare("message length overflows"))?;

        let mut data = Vec::with_capacity(len.min(first.len() * shares.len()));
        let mut chunk = &first[used..];
        loop {
            let take = chunk.len().min(len - data.len());
            data.extend_from_slice(&chunk[..take]);
            i += 1;
            if data.len() == len {
                break;
            }
            let next = shares
                .get(i)
                .ok_or(CodecError::InvalidShare("message truncated"))?;
            if share_namespace(next)? != namespace {
                return Err(CodecError::InvalidShare(
                    "message continues into another namespace",
                ));
            }
            chunk = &next[NAMESPACE_SIZE..];
        }
        messages.push(Message { namespace, data });
    }
    Ok(messages)
}

fn put_uvarint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Reads an unsigned LEB128 varint, returning the value and bytes consumed.
fn read_uvarint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0_u64;
    for (i, byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        let low = u64::from(byte & 0x7F);
        if i == MAX_VARINT_LEN - 1 && low > 1 {
            return None;
        }
        value |= low << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{
        parse_messages, put_uvarint, read_uvarint, share_namespace, split_messages,
        tail_padding_share, Message, MSG_SHARE_SIZE, SHARE_SIZE,
    };
    use crate::error::CodecError;
    use quadrant_core::{NamespaceIdN, TAIL_PADDING_NAMESPACE};

    fn ns(last: u8) -> NamespaceIdN<8> {
        NamespaceIdN([0, 0, 0, 0, 0, 0, 0, last])
    }

    #[test]
    fn share_size_constants() {
        assert_eq!(SHARE_SIZE, 256);
        assert_eq!(MSG_SHARE_SIZE, 248);
    }

    #[test]
    fn small_message_fits_one_share() {
        let shares = split_messages(
            &[Message {
                namespace: ns(9),
                data: b"hello".to_vec(),
            }],
            SHARE_SIZE,
        )
        .expect("split");
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].len(), SHARE_SIZE);
        assert_eq!(&shares[0][..8], ns(9).as_bytes());
        assert_eq!(shares[0][8], 5);
        assert_eq!(&shares[0][9..14], b"hello");
        assert!(shares[0][14..].iter().all(|b| *b == 0));
    }

    #[test]
    fn long_message_spans_shares_and_reassembles() {
        let data: Vec<u8> = (0..600_u32).map(|i| i as u8).collect();
        let messages = vec![
            Message {
                namespace: ns(2),
                data: data.clone(),
            },
            Message {
                namespace: ns(2),
                data: Vec::new(),
            },
            Message {
                namespace: ns(7),
                data: b"tail".to_vec(),
            },
        ];
        let mut shares = split_messages(&messages, SHARE_SIZE).expect("split");
        // 600 bytes plus a 2-byte length prefix need three 248-byte chunks
        assert_eq!(shares.len(), 3 + 1 + 1);
        shares.push(tail_padding_share(SHARE_SIZE));
        assert_eq!(parse_messages(&shares).expect("parse"), messages);
    }

    #[test]
    fn unsorted_messages_are_rejected() {
        let err = split_messages(
            &[
                Message {
                    namespace: ns(5),
                    data: vec![1],
                },
                Message {
                    namespace: ns(4),
                    data: vec![2],
                },
            ],
            SHARE_SIZE,
        )
        .expect_err("unsorted input must fail");
        assert!(matches!(err, CodecError::InvalidShare(_)));
        assert!(split_messages(&[], 8).is_err());
    }

    #[test]
    fn tail_padding_share_is_zero_payload() {
        let share = tail_padding_share(64);
        assert_eq!(share.len(), 64);
        assert_eq!(share_namespace(&share).expect("namespace"), TAIL_PADDING_NAMESPACE);
        assert!(share[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn truncated_message_is_rejected() {
        let messages = vec![Message {
            namespace: ns(3),
            data: vec![0xAA; 300],
        }];
        let shares = split_messages(&messages, SHARE_SIZE).expect("split");
        assert!(matches!(
            parse_messages(&shares[..1]),
            Err(CodecError::InvalidShare("message truncated"))
        ));
    }

    #[test]
    fn uvarint_round_trips_boundaries() {
        for value in [0_u64, 1, 127, 128, 300, 16_384, u64::from(u32::MAX), u64::MAX] {
            let mut buf = Vec::new();
            put_uvarint(&mut buf, value);
            assert_eq!(read_uvarint(&buf), Some((value, buf.len())));
        }
        assert_eq!(read_uvarint(&[0x80, 0x80]), None);
        assert_eq!(read_uvarint(&[0xFF; 11]), None);
    }
}
