//! Spanning-tree advertisements and their signature chain.
//!
//! Wire layout: `root(32) seq(8)` followed by zero or more
//! `next(32) port(8) sig(64)` hop records. Hop `i` is signed by `root` when
//! `i == 0`, otherwise by `hops[i-1].next`, over every byte before its own
//! signature.

use crate::codec::{read_key, read_signature, read_u64};
use crate::crypto::SignatureVerifier;
use crate::error::WireError;
use crate::store::DhtStore;
use crate::types::{PublicKey, SequenceNumber, Signature, KEY_SIZE, SIGNATURE_SIZE, U64_SIZE};

/// `root(32) seq(8)`.
pub const TREE_INFO_HEADER_SIZE: usize = KEY_SIZE + U64_SIZE;

/// `next(32) port(8) sig(64)`.
pub const TREE_HOP_SIZE: usize = KEY_SIZE + U64_SIZE + SIGNATURE_SIZE;

/// One signed edge from a signer toward `next`, leaving through `port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHop {
    pub next: PublicKey,
    pub port: u64,
    pub sig: Signature,
}

/// A node's path from the tree root, as advertised to its peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeInfo {
    pub root: PublicKey,
    pub seq: SequenceNumber,
    pub hops: Vec<TreeHop>,
}

impl TreeInfo {
    /// A root's own advertisement: no hops.
    pub fn new(root: PublicKey, seq: SequenceNumber) -> Self {
        Self {
            root,
            seq,
            hops: Vec::new(),
        }
    }

    /// Length of the prefix signed by hop `i`.
    pub const fn signed_len(i: usize) -> usize {
        TREE_INFO_HEADER_SIZE + TREE_HOP_SIZE * i + KEY_SIZE + U64_SIZE
    }

    /// Parse header and hop records. No sender or signature checks.
    pub fn decode(raw: &[u8]) -> Result<Self, WireError> {
        if raw.len() < TREE_INFO_HEADER_SIZE {
            return Err(WireError::malformed(format!(
                "tree-info: {} bytes, header needs {TREE_INFO_HEADER_SIZE}",
                raw.len()
            )));
        }
        let body = raw.len() - TREE_INFO_HEADER_SIZE;
        if body % TREE_HOP_SIZE != 0 {
            return Err(WireError::malformed(format!(
                "tree-info: {body} hop bytes is not a multiple of {TREE_HOP_SIZE}"
            )));
        }

        let root = read_key(raw, 0)?;
        let seq = read_u64(raw, KEY_SIZE)?;
        let hops = raw[TREE_INFO_HEADER_SIZE..]
            .chunks_exact(TREE_HOP_SIZE)
            .map(|record| -> Result<TreeHop, WireError> {
                Ok(TreeHop {
                    next: read_key(record, 0)?,
                    port: read_u64(record, KEY_SIZE)?,
                    sig: read_signature(record, KEY_SIZE + U64_SIZE)?,
                })
            })
            .collect::<Result<Vec<_>, WireError>>()?;

        Ok(Self { root, seq, hops })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TREE_INFO_HEADER_SIZE + TREE_HOP_SIZE * self.hops.len());
        out.extend_from_slice(self.root.as_bytes());
        out.extend_from_slice(&self.seq.to_be_bytes());
        for hop in &self.hops {
            out.extend_from_slice(hop.next.as_bytes());
            out.extend_from_slice(&hop.port.to_be_bytes());
            out.extend_from_slice(hop.sig.as_bytes());
        }
        out
    }

    /// Bytes the current holder must sign to extend the chain to `next` via `port`.
    pub fn bytes_for_next_hop(&self, next: &PublicKey, port: u64) -> Vec<u8> {
        let mut out = self.to_bytes();
        out.extend_from_slice(next.as_bytes());
        out.extend_from_slice(&port.to_be_bytes());
        out
    }

    /// Key that signs hop `i`.
    pub fn signer(&self, i: usize) -> PublicKey {
        match i.checked_sub(1).and_then(|prev| self.hops.get(prev)) {
            Some(prev) => prev.next,
            None => self.root,
        }
    }

    /// The peer this advertisement must arrive from.
    ///
    /// The last hop points at the receiver, so the sender is the one before
    /// it. With fewer than two hops the sender is the root itself.
    pub fn expected_sender(&self) -> PublicKey {
        match self.hops.len() {
            0 | 1 => self.root,
            n => self.hops[n - 2].next,
        }
    }

    pub fn check_sender(&self, sender: &PublicKey) -> Result<(), WireError> {
        let expected = self.expected_sender();
        if expected != *sender {
            return Err(WireError::SenderMismatch {
                expected,
                actual: *sender,
            });
        }
        Ok(())
    }
}

/// Decode and fully validate a tree-info body received from `sender`.
///
/// Hop signatures are checked one at a time in hop order; the first failure
/// aborts. Nothing is returned unless every check passed.
pub async fn ingest<V: SignatureVerifier + ?Sized>(
    raw: &[u8],
    sender: &PublicKey,
    verifier: &V,
) -> Result<TreeInfo, WireError> {
    let info = TreeInfo::decode(raw)?;
    info.check_sender(sender)?;

    for (i, hop) in info.hops.iter().enumerate() {
        // decode() guaranteed raw.len() == header + n * hop size.
        let signed = &raw[..TreeInfo::signed_len(i)];
        if !verifier.verify(&hop.sig, signed, &info.signer(i)).await {
            return Err(WireError::SignatureInvalid { hop: i });
        }
    }

    Ok(info)
}

/// Ingest a tree-info body and hand it to the store on success.
pub async fn handle_tree_info<V, S>(
    raw: &[u8],
    sender: &PublicKey,
    verifier: &V,
    store: &S,
) -> Result<(), WireError>
where
    V: SignatureVerifier + ?Sized,
    S: DhtStore + ?Sized,
{
    let info = ingest(raw, sender, verifier).await?;
    store.update(info).await;
    Ok(())
}
