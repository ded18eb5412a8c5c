#![allow(dead_code)]

use ed25519_dalek::{Signer, SigningKey};
use ygg_proto::{PublicKey, Signature, TreeHop, TreeInfo};

pub use ygg_proto::store::recording::{RecordingStore, StoreCall};

/// Deterministic Ed25519 keypair from a seed byte.
pub fn keypair(seed: u8) -> (SigningKey, PublicKey) {
    let sk = SigningKey::from_bytes(&[seed; 32]);
    let pk = PublicKey::from_bytes(sk.verifying_key().to_bytes());
    (sk, pk)
}

pub fn sign(sk: &SigningKey, message: &[u8]) -> Signature {
    Signature::from_bytes(sk.sign(message).to_bytes())
}

/// Append a hop to `info`, signed by the current holder `signer`.
pub fn extend(info: &mut TreeInfo, signer: &SigningKey, next: PublicKey, port: u64) {
    let sig = sign(signer, &info.bytes_for_next_hop(&next, port));
    info.hops.push(TreeHop { next, port, sig });
}

/// A correctly signed chain `root -> keys[0] -> keys[1] -> ...`.
///
/// `seeds[0]` is the root; each following seed becomes the next hop.
pub fn signed_chain(seeds: &[u8], seq: u64, ports: &[u64]) -> TreeInfo {
    let (root_sk, root) = keypair(seeds[0]);
    let mut info = TreeInfo::new(root, seq);
    let mut signer = root_sk;
    for (i, &seed) in seeds[1..].iter().enumerate() {
        let (next_sk, next) = keypair(seed);
        extend(&mut info, &signer, next, ports[i % ports.len()]);
        signer = next_sk;
    }
    info
}
