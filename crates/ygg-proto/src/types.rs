use std::fmt;

/// Size of an Ed25519 public key on the wire.
pub const KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature on the wire.
pub const SIGNATURE_SIZE: usize = 64;

/// Size of a big-endian `u64` field (sequence numbers, ports).
pub const U64_SIZE: usize = 8;

/// Per-key monotonically increasing counter used to discard stale state.
pub type SequenceNumber = u64;

/// A node identity: 32 raw Ed25519 public key bytes.
///
/// Equality is byte-exact; no point validation happens here.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; KEY_SIZE]);

impl PublicKey {
    /// Wrap raw key bytes. Not checked for being a valid curve point.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// The key exactly as it appears on the wire.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex of all 32 bytes; same as `Display`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; KEY_SIZE]> for PublicKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are enough to tell keys apart in logs.
        write!(f, "PublicKey({}..)", hex::encode(&self.0[..8]))
    }
}

/// A 64-byte Ed25519 signature, valid only over one exact byte range.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    pub const fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_SIZE]> for Signature {
    fn from(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}
