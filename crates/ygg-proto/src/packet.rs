//! Packet type tags and the egress encoder.
//!
//! Every packet on a peer link is `[type: u8][body]`.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use ygg_metrics::HandledKind;

/// One-byte packet type tag.
///
/// Values outside 0..=10 are not represented; the dispatcher ignores them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacketType {
    Dummy = 0,
    TreeInfo = 1,
    DhtBootstrap = 2,
    DhtBootstrapAck = 3,
    DhtSetup = 4,
    DhtTeardown = 5,
    PathNotify = 6,
    PathLookup = 7,
    PathResponse = 8,
    DhtTraffic = 9,
    PathTraffic = 10,
}

impl PacketType {
    pub const ALL: [PacketType; 11] = [
        PacketType::Dummy,
        PacketType::TreeInfo,
        PacketType::DhtBootstrap,
        PacketType::DhtBootstrapAck,
        PacketType::DhtSetup,
        PacketType::DhtTeardown,
        PacketType::PathNotify,
        PacketType::PathLookup,
        PacketType::PathResponse,
        PacketType::DhtTraffic,
        PacketType::PathTraffic,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(usize::from(byte)).copied()
    }

    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// The control-plane kind this packet is handled as, or `None` for the
    /// reserved data-plane kinds.
    pub const fn handled_kind(self) -> Option<HandledKind> {
        match self {
            PacketType::TreeInfo => Some(HandledKind::TreeInfo),
            PacketType::DhtBootstrap => Some(HandledKind::Bootstrap),
            PacketType::DhtBootstrapAck => Some(HandledKind::BootstrapAck),
            PacketType::DhtSetup => Some(HandledKind::Setup),
            PacketType::DhtTeardown => Some(HandledKind::Teardown),
            PacketType::PathNotify => Some(HandledKind::PathNotify),
            PacketType::Dummy
            | PacketType::PathLookup
            | PacketType::PathResponse
            | PacketType::DhtTraffic
            | PacketType::PathTraffic => None,
        }
    }
}

impl From<PacketType> for u8 {
    fn from(kind: PacketType) -> u8 {
        kind.as_byte()
    }
}

/// Prefix `payload` with the type tag.
pub fn encode_packet(kind: PacketType, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + payload.len());
    buf.put_u8(kind.as_byte());
    buf.put_slice(payload);
    buf.freeze()
}

/// Egress stage: tags outbound payloads.
///
/// Application payloads that do not name a type get `default_type`.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    default_type: PacketType,
}

impl Encoder {
    pub fn new(default_type: PacketType) -> Self {
        Self { default_type }
    }

    pub fn default_type(&self) -> PacketType {
        self.default_type
    }

    pub fn encode(&self, payload: &[u8]) -> Bytes {
        encode_packet(self.default_type, payload)
    }

    pub fn encode_as(&self, kind: PacketType, payload: &[u8]) -> Bytes {
        encode_packet(kind, payload)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(PacketType::PathTraffic)
    }
}
