//! Ingress stage: route one packet to its handler by type tag.
//!
//! Pure with respect to link state: the only side effects are the calls the
//! handlers make on the verifier and the store.

use std::sync::Arc;

use crate::crypto::SignatureVerifier;
use crate::dht;
use crate::error::WireError;
use crate::packet::PacketType;
use crate::store::DhtStore;
use crate::tree;
use crate::types::PublicKey;

/// What the dispatcher did with a packet that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Decoded, validated and handed to the store.
    Handled(PacketType),
    /// Known data-plane kind with no handler yet.
    Reserved(PacketType),
    /// Type byte outside the known range; ignored for forward compatibility.
    Unknown(u8),
    /// Zero-length chunk.
    Empty,
}

/// Routes packets arriving from one peer (`remote`).
pub struct Dispatcher<V: ?Sized, S: ?Sized> {
    remote: PublicKey,
    verifier: Arc<V>,
    store: Arc<S>,
}

impl<V, S> Dispatcher<V, S>
where
    V: SignatureVerifier + ?Sized,
    S: DhtStore + ?Sized,
{
    pub fn new(remote: PublicKey, verifier: Arc<V>, store: Arc<S>) -> Self {
        Self {
            remote,
            verifier,
            store,
        }
    }

    pub fn remote(&self) -> &PublicKey {
        &self.remote
    }

    /// Handle one complete packet, type byte included.
    pub async fn dispatch(&self, chunk: &[u8]) -> Result<Dispatched, WireError> {
        let Some((&tag, body)) = chunk.split_first() else {
            return Ok(Dispatched::Empty);
        };
        let Some(kind) = PacketType::from_byte(tag) else {
            return Ok(Dispatched::Unknown(tag));
        };

        let store = self.store.as_ref();
        match kind {
            PacketType::TreeInfo => {
                tree::handle_tree_info(body, &self.remote, self.verifier.as_ref(), store).await?
            }
            PacketType::DhtBootstrap => dht::handle_bootstrap(body, store).await?,
            PacketType::DhtBootstrapAck => dht::handle_bootstrap_ack(body, store).await?,
            PacketType::DhtSetup => dht::handle_setup(body, store).await?,
            PacketType::DhtTeardown => dht::handle_teardown(body, store).await?,
            PacketType::PathNotify => dht::handle_path_notify(body, store).await?,
            PacketType::Dummy
            | PacketType::PathLookup
            | PacketType::PathResponse
            | PacketType::DhtTraffic
            | PacketType::PathTraffic => return Ok(Dispatched::Reserved(kind)),
        }
        Ok(Dispatched::Handled(kind))
    }
}
