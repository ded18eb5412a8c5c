use serde::{Deserialize, Serialize};

use crate::packet::PacketType;

/// Default cap on a single inbound packet (64 KiB).
///
/// Room for a tree-info of over 600 hops; control-plane packets are far
/// smaller in practice.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 64 * 1024;

/// Configuration for a [`PeerLink`](crate::link::PeerLink).
///
/// All fields have defaults. Use the builder methods:
///
/// ```rust
/// use ygg_proto::{LinkConfig, PacketType};
///
/// let config = LinkConfig::new()
///     .max_packet_size(64 * 1024)
///     .egress_type(PacketType::DhtTraffic);
/// ```
///
/// Also deserializable, so an embedding node can keep it in its own config
/// file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Largest inbound packet accepted, type byte included. Larger packets
    /// close the link.
    pub max_packet_size: usize,
    /// Capacity of the egress command channel.
    pub command_buffer: usize,
    /// Type tag for outbound payloads sent without an explicit type.
    pub egress_type: PacketType,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkConfig {
    /// Create a config with defaults.
    ///
    /// If `YGG_MAX_PACKET_SIZE` is set to an integer it replaces the default
    /// packet cap. Can still be overridden with [`.max_packet_size()`](Self::max_packet_size).
    pub fn new() -> Self {
        let max_packet_size = std::env::var("YGG_MAX_PACKET_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_PACKET_SIZE);

        Self {
            max_packet_size,
            command_buffer: 64,
            egress_type: PacketType::PathTraffic,
        }
    }

    pub fn max_packet_size(mut self, bytes: usize) -> Self {
        self.max_packet_size = bytes;
        self
    }

    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }

    pub fn egress_type(mut self, kind: PacketType) -> Self {
        self.egress_type = kind;
        self
    }
}
