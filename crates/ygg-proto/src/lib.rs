//! ygg control-plane wire protocol.
//!
//! Decodes the packets exchanged between directly connected mesh peers,
//! verifies the signature chain of spanning-tree advertisements, and hands
//! DHT bootstrap / path setup / teardown messages to the routing store.
//!
//! Wire format: `[type: u8][body]`, fixed-width big-endian fields, base-128
//! varints. Crypto: Ed25519 (verification only).
//!
//! Signing, key management, transports and the routing store itself live
//! outside this crate; see [`SignatureVerifier`] and [`DhtStore`].

pub mod codec;
pub mod config;
pub mod crypto;
pub mod dht;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod packet;
pub mod store;
pub mod tree;
pub mod types;

pub use codec::{decode_path, decode_varint, encode_varint, encode_varint_u64};
pub use config::LinkConfig;
pub use crypto::{Ed25519Verifier, SignatureVerifier};
pub use dht::{
    BootstrapAck, BootstrapMessage, DhtSetupToken, PathNotifyMessage, SetupMessage,
    TeardownMessage, TreeLabel,
};
pub use dispatch::{Dispatched, Dispatcher};
pub use error::{LinkError, WireError};
pub use link::{CloseReason, LinkChannels, LinkClosed, LinkHandle, PeerLink};
pub use packet::{encode_packet, Encoder, PacketType};
pub use store::DhtStore;
pub use tree::{ingest, TreeHop, TreeInfo};
pub use types::{PublicKey, SequenceNumber, Signature};
pub use ygg_metrics::LinkMetricsSnapshot;
