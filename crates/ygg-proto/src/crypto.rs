//! Signature verification seam.
//!
//! The protocol only ever verifies; signing and key generation belong to the
//! node that owns the private key.

use crate::types::{PublicKey, Signature};

/// Verifies a signature over an exact byte range.
///
/// Async so that implementations may offload to a worker pool or hardware;
/// tree-info ingestion awaits one call per hop, in hop order.
#[async_trait::async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, sig: &Signature, message: &[u8], key: &PublicKey) -> bool;
}

/// Ed25519 verification with `verify_strict` (rejects non-canonical
/// signatures and small-order keys).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    pub fn verify_sync(sig: &Signature, message: &[u8], key: &PublicKey) -> bool {
        let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(key.as_bytes()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(sig.as_bytes());
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}

#[async_trait::async_trait]
impl SignatureVerifier for Ed25519Verifier {
    async fn verify(&self, sig: &Signature, message: &[u8], key: &PublicKey) -> bool {
        Self::verify_sync(sig, message, key)
    }
}
