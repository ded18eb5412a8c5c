//! DHT control messages: bootstrap, bootstrap-ack, setup, teardown and
//! path-notify.
//!
//! Each handler decodes one packet body and hands the structured message to
//! the [`DhtStore`]. None of them check signatures: the store owns the keys
//! and state needed to decide whether a label or token is acceptable.

mod label;

pub use label::{DhtSetupToken, TreeLabel, SETUP_TOKEN_HEADER_SIZE, TREE_LABEL_HEADER_SIZE};

use num_traits::ToPrimitive;

use crate::codec::{decode_varint, encode_varint_u64, Reader};
use crate::error::WireError;
use crate::store::DhtStore;
use crate::types::{PublicKey, SequenceNumber, Signature, KEY_SIZE, U64_SIZE};

/// Size of a teardown body: sig(8) key(32) root(32) root_seq(8).
pub const TEARDOWN_SIZE: usize = U64_SIZE + 2 * KEY_SIZE + U64_SIZE;

// ── Messages ─────────────────────────────────────────────────────────

/// A node announcing itself into the DHT keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMessage {
    pub label: TreeLabel,
}

impl BootstrapMessage {
    pub fn decode(raw: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            label: TreeLabel::decode(raw)?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.label.to_bytes()
    }
}

/// Reply to a bootstrap: the echoed label plus a setup token from the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAck {
    pub bootstrap: TreeLabel,
    pub response: DhtSetupToken,
}

impl BootstrapAck {
    /// Layout: varint label length, label, token (rest of the body).
    pub fn decode(raw: &[u8]) -> Result<Self, WireError> {
        let (length, start) = decode_varint(raw)?;
        let end = length
            .to_usize()
            .and_then(|len| start.checked_add(len))
            .filter(|&end| end <= raw.len())
            .ok_or_else(|| {
                WireError::malformed(format!(
                    "bootstrap-ack: label length {length} overruns {} byte body",
                    raw.len()
                ))
            })?;
        let bootstrap = TreeLabel::decode_framed(&raw[start..end])?;
        let response = DhtSetupToken::decode(&raw[end..])?;
        Ok(Self {
            bootstrap,
            response,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let label = self.bootstrap.to_bytes();
        let mut out = encode_varint_u64(label.len() as u64);
        out.extend_from_slice(&label);
        out.extend_from_slice(&self.response.to_bytes());
        out
    }
}

/// Request to install forwarding state for a path toward `token.dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupMessage {
    pub sig: Signature,
    pub seq: SequenceNumber,
    pub token: DhtSetupToken,
}

impl SetupMessage {
    pub fn decode(raw: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(raw, "dht-setup");
        let sig = r.signature()?;
        let seq = r.u64()?;
        let token = DhtSetupToken::decode(r.rest())?;
        Ok(Self { sig, seq, token })
    }

    /// Bytes covered by `sig`: `seq ‖ token`.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut out = self.seq.to_be_bytes().to_vec();
        out.extend_from_slice(&self.token.to_bytes());
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.sig.as_bytes().to_vec();
        out.extend_from_slice(&self.signed_bytes());
        out
    }
}

/// Revocation of the path identified by `(key, root, root_seq)`.
///
/// `sig` is an 8-byte integer on the deployed wire, unlike every other
/// signature in the protocol; widening it would shift every later offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownMessage {
    pub sig: u64,
    pub key: PublicKey,
    pub root: PublicKey,
    pub root_seq: SequenceNumber,
}

impl TeardownMessage {
    pub fn decode(raw: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(raw, "dht-teardown");
        Ok(Self {
            sig: r.u64()?,
            key: r.key()?,
            root: r.key()?,
            root_seq: r.u64()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TEARDOWN_SIZE);
        out.extend_from_slice(&self.sig.to_be_bytes());
        out.extend_from_slice(self.key.as_bytes());
        out.extend_from_slice(self.root.as_bytes());
        out.extend_from_slice(&self.root_seq.to_be_bytes());
        out
    }
}

/// Tells `dest` how to reach the node described by `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNotifyMessage {
    pub sig: Signature,
    pub dest: PublicKey,
    pub label: TreeLabel,
}

impl PathNotifyMessage {
    pub fn decode(raw: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(raw, "path-notify");
        let sig = r.signature()?;
        let dest = r.key()?;
        let label = TreeLabel::decode(r.rest())?;
        Ok(Self { sig, dest, label })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.sig.as_bytes().to_vec();
        out.extend_from_slice(self.dest.as_bytes());
        out.extend_from_slice(&self.label.to_bytes());
        out
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Decode a bootstrap body and pass it to [`DhtStore::handle_bootstrap`].
pub async fn handle_bootstrap<S: DhtStore + ?Sized>(
    raw: &[u8],
    store: &S,
) -> Result<(), WireError> {
    store.handle_bootstrap(BootstrapMessage::decode(raw)?).await;
    Ok(())
}

/// Decode a bootstrap-ack body (length-framed label, then a setup token)
/// and pass it to [`DhtStore::handle_bootstrap_ack`].
pub async fn handle_bootstrap_ack<S: DhtStore + ?Sized>(
    raw: &[u8],
    store: &S,
) -> Result<(), WireError> {
    store.handle_bootstrap_ack(BootstrapAck::decode(raw)?).await;
    Ok(())
}

/// Decode a setup body and pass it to [`DhtStore::handle_setup`].
pub async fn handle_setup<S: DhtStore + ?Sized>(
    raw: &[u8],
    store: &S,
) -> Result<(), WireError> {
    store.handle_setup(SetupMessage::decode(raw)?).await;
    Ok(())
}

/// Decode a fixed 80-byte teardown body and pass it to
/// [`DhtStore::handle_teardown`]. Trailing bytes are ignored.
pub async fn handle_teardown<S: DhtStore + ?Sized>(
    raw: &[u8],
    store: &S,
) -> Result<(), WireError> {
    store.handle_teardown(TeardownMessage::decode(raw)?).await;
    Ok(())
}

/// Decode a path-notify body and pass it to [`DhtStore::handle_path_notify`].
pub async fn handle_path_notify<S: DhtStore + ?Sized>(
    raw: &[u8],
    store: &S,
) -> Result<(), WireError> {
    store.handle_path_notify(PathNotifyMessage::decode(raw)?).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::recording::{RecordingStore, StoreCall};
    use crate::types::SIGNATURE_SIZE;

    fn label(key: u8, path_bytes: Vec<u8>) -> TreeLabel {
        TreeLabel::new(
            Signature([key; SIGNATURE_SIZE]),
            PublicKey([key; KEY_SIZE]),
            PublicKey([0xee; KEY_SIZE]),
            3,
            path_bytes,
        )
        .unwrap()
    }

    fn token() -> DhtSetupToken {
        DhtSetupToken {
            sig: Signature([0x70; SIGNATURE_SIZE]),
            source: PublicKey([0x71; KEY_SIZE]),
            dest: label(0x72, vec![0x01, 0x02, 0x00]),
        }
    }

    #[tokio::test]
    async fn bootstrap_forwards_label() {
        let store = RecordingStore::new();
        let msg = BootstrapMessage {
            label: label(0x10, vec![0x03, 0x00]),
        };
        handle_bootstrap(&msg.to_bytes(), &store).await.unwrap();
        assert_eq!(store.calls(), vec![StoreCall::Bootstrap(msg)]);
    }

    #[tokio::test]
    async fn bootstrap_too_short_reaches_no_store() {
        let store = RecordingStore::new();
        let err = handle_bootstrap(&[0u8; 100], &store).await.unwrap_err();
        assert!(matches!(err, WireError::MalformedPacket { .. }));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn bootstrap_ack_layout_and_decode() {
        let ack = BootstrapAck {
            bootstrap: label(0x20, vec![0x05, 0x00]),
            response: token(),
        };
        let bytes = ack.to_bytes();
        // 138-byte label: length prefix is two varint bytes.
        assert_eq!(&bytes[..2], &[0x8a, 0x01]);
        assert_eq!(BootstrapAck::decode(&bytes).unwrap(), ack);
    }

    #[test]
    fn bootstrap_ack_length_one_too_large_is_malformed() {
        let bootstrap = label(0x20, vec![0x05, 0x00]).to_bytes();
        let mut bytes = encode_varint_u64(bootstrap.len() as u64 + 1);
        bytes.extend_from_slice(&bootstrap);
        bytes.extend_from_slice(&token().to_bytes());

        assert!(matches!(
            BootstrapAck::decode(&bytes),
            Err(WireError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn bootstrap_ack_length_one_too_small_is_malformed() {
        let bootstrap = label(0x20, vec![0x05, 0x00]).to_bytes();
        let mut bytes = encode_varint_u64(bootstrap.len() as u64 - 1);
        bytes.extend_from_slice(&bootstrap);
        bytes.extend_from_slice(&token().to_bytes());

        assert!(matches!(
            BootstrapAck::decode(&bytes),
            Err(WireError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn bootstrap_ack_length_past_end_is_malformed() {
        let mut bytes = encode_varint_u64(10_000);
        bytes.extend_from_slice(&[0u8; 300]);
        match BootstrapAck::decode(&bytes) {
            Err(WireError::MalformedPacket { reason }) => assert!(reason.contains("overruns")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bootstrap_ack_huge_length_is_malformed() {
        // A 2^70 length does not fit in usize.
        let mut bytes = vec![0x80; 10];
        bytes.push(0x01);
        assert!(matches!(
            BootstrapAck::decode(&bytes),
            Err(WireError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn bootstrap_ack_without_length_is_malformed_varint() {
        assert_eq!(BootstrapAck::decode(&[0x80]), Err(WireError::MalformedVarInt));
    }

    #[tokio::test]
    async fn setup_forwards_message() {
        let store = RecordingStore::new();
        let msg = SetupMessage {
            sig: Signature([0x61; SIGNATURE_SIZE]),
            seq: 77,
            token: token(),
        };
        let bytes = msg.to_bytes();
        assert_eq!(&bytes[64..72], &77u64.to_be_bytes());
        handle_setup(&bytes, &store).await.unwrap();
        assert_eq!(store.calls(), vec![StoreCall::Setup(msg.clone())]);
        assert_eq!(msg.signed_bytes(), bytes[64..].to_vec());
    }

    #[test]
    fn setup_truncated_token_is_malformed() {
        let mut bytes = vec![0u8; SIGNATURE_SIZE + U64_SIZE];
        bytes.extend_from_slice(&[0u8; SETUP_TOKEN_HEADER_SIZE]);
        assert!(SetupMessage::decode(&bytes).is_err());
    }

    #[tokio::test]
    async fn teardown_reads_fixed_offsets() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&0x0102_0304_0506_0708u64.to_be_bytes());
        raw.extend_from_slice(&[0xaa; KEY_SIZE]);
        raw.extend_from_slice(&[0xbb; KEY_SIZE]);
        raw.extend_from_slice(&12u64.to_be_bytes());
        assert_eq!(raw.len(), TEARDOWN_SIZE);

        let store = RecordingStore::new();
        handle_teardown(&raw, &store).await.unwrap();

        let expected = TeardownMessage {
            sig: 0x0102_0304_0506_0708,
            key: PublicKey([0xaa; KEY_SIZE]),
            root: PublicKey([0xbb; KEY_SIZE]),
            root_seq: 12,
        };
        assert_eq!(store.calls(), vec![StoreCall::Teardown(expected)]);
        assert_eq!(expected.to_bytes(), raw);
    }

    #[test]
    fn teardown_short_is_malformed() {
        assert!(TeardownMessage::decode(&[0u8; TEARDOWN_SIZE - 1]).is_err());
    }

    #[tokio::test]
    async fn path_notify_forwards_message() {
        let msg = PathNotifyMessage {
            sig: Signature([0x90; SIGNATURE_SIZE]),
            dest: PublicKey([0x91; KEY_SIZE]),
            label: label(0x92, vec![0x00]),
        };
        let store = RecordingStore::new();
        handle_path_notify(&msg.to_bytes(), &store).await.unwrap();
        assert_eq!(store.calls(), vec![StoreCall::PathNotify(msg)]);
    }
}
