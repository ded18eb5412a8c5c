use num_bigint::BigUint;

use crate::codec::{decode_path, path_terminator, Reader};
use crate::error::WireError;
use crate::types::{PublicKey, SequenceNumber, Signature, KEY_SIZE, SIGNATURE_SIZE, U64_SIZE};

/// Fixed part of a label: sig, key, root, seq.
pub const TREE_LABEL_HEADER_SIZE: usize = SIGNATURE_SIZE + 2 * KEY_SIZE + U64_SIZE;

/// Fixed part of a setup token before its label: sig, source.
pub const SETUP_TOKEN_HEADER_SIZE: usize = SIGNATURE_SIZE + KEY_SIZE;

/// A signed route back to `key` through the tree identified by `root`/`seq`.
///
/// `sig` is not checked here. The store must verify it over
/// [`signed_bytes`](Self::signed_bytes) under `key` before trusting the label.
///
/// The path is held in its wire form, which is what gets re-encoded and
/// signed; the decoded ports are derived from it once, at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLabel {
    pub sig: Signature,
    pub key: PublicKey,
    pub root: PublicKey,
    pub seq: SequenceNumber,
    path: Vec<BigUint>,
    path_bytes: Vec<u8>,
}

impl TreeLabel {
    /// Build a label from its fields and the raw path encoding.
    ///
    /// Fails if `path_bytes` exceeds [`MAX_PATH_LEN`](crate::codec::MAX_PATH_LEN).
    pub fn new(
        sig: Signature,
        key: PublicKey,
        root: PublicKey,
        seq: SequenceNumber,
        path_bytes: Vec<u8>,
    ) -> Result<Self, WireError> {
        Ok(Self {
            sig,
            key,
            root,
            seq,
            path: decode_path(&path_bytes)?,
            path_bytes,
        })
    }

    /// Ports from the root toward `key`, as decoded by [`decode_path`].
    pub fn path(&self) -> &[BigUint] {
        &self.path
    }

    /// The path exactly as received.
    pub fn path_bytes(&self) -> &[u8] {
        &self.path_bytes
    }

    /// Decode a label that runs to the end of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(buf, "tree label");
        let sig = r.signature()?;
        let key = r.key()?;
        let root = r.key()?;
        let seq = r.u64()?;
        Self::new(sig, key, root, seq, r.rest().to_vec())
    }

    /// Decode a label whose byte length was given by an outer length prefix.
    ///
    /// The path's zero terminator must be the last byte of `buf`. A prefix
    /// that is too short cuts the terminator off; one that is too long leaves
    /// bytes after it. Both are rejected.
    pub fn decode_framed(buf: &[u8]) -> Result<Self, WireError> {
        let label = Self::decode(buf)?;
        match path_terminator(&label.path_bytes) {
            Some(end) if end + 1 == label.path_bytes.len() => Ok(label),
            Some(end) => Err(WireError::malformed(format!(
                "framed tree label: {} bytes after path terminator",
                label.path_bytes.len() - end - 1
            ))),
            None => Err(WireError::malformed(
                "framed tree label: path has no terminator",
            )),
        }
    }

    /// Bytes covered by `sig`: `key ‖ root ‖ seq ‖ path`.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * KEY_SIZE + U64_SIZE + self.path_bytes.len());
        out.extend_from_slice(self.key.as_bytes());
        out.extend_from_slice(self.root.as_bytes());
        out.extend_from_slice(&self.seq.to_be_bytes());
        out.extend_from_slice(&self.path_bytes);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TREE_LABEL_HEADER_SIZE + self.path_bytes.len());
        out.extend_from_slice(self.sig.as_bytes());
        out.extend_from_slice(&self.signed_bytes());
        out
    }

    pub fn encoded_len(&self) -> usize {
        TREE_LABEL_HEADER_SIZE + self.path_bytes.len()
    }
}

/// Permission, signed by the destination, for `source` to set up a path to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhtSetupToken {
    pub sig: Signature,
    pub source: PublicKey,
    pub dest: TreeLabel,
}

impl DhtSetupToken {
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(buf, "setup token");
        let sig = r.signature()?;
        let source = r.key()?;
        let dest = TreeLabel::decode(r.rest())?;
        Ok(Self { sig, source, dest })
    }

    /// Bytes covered by `sig`: `source ‖ dest`.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(KEY_SIZE + self.dest.encoded_len());
        out.extend_from_slice(self.source.as_bytes());
        out.extend_from_slice(&self.dest.to_bytes());
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SETUP_TOKEN_HEADER_SIZE + self.dest.encoded_len());
        out.extend_from_slice(self.sig.as_bytes());
        out.extend_from_slice(&self.signed_bytes());
        out
    }
}
