//! Packet counters for ygg peer links.
//!
//! [`Counter`] is a relaxed atomic tally. [`LinkMetrics`] groups the counters
//! one peer link maintains, and [`LinkMetricsSnapshot`] is the plain-data view
//! handed to whoever reports them (admin socket, logs, tests).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A monotonically increasing counter.
///
/// Relaxed ordering only: the values are statistics, nothing synchronizes on them.
#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Add a byte length. Lengths never exceed `u64` on supported targets.
    pub fn add_len(&self, len: usize) {
        self.add(len as u64);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Counter({})", self.get())
    }
}

impl Serialize for Counter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.get())
    }
}

/// Control-plane packet kinds a link counts individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandledKind {
    TreeInfo,
    Bootstrap,
    BootstrapAck,
    Setup,
    Teardown,
    PathNotify,
}

/// Counters for one peer link.
///
/// Shared between the link's ingress and egress tasks behind an `Arc`.
#[derive(Debug, Default, Serialize)]
pub struct LinkMetrics {
    pub packets_in: Counter,
    pub bytes_in: Counter,
    pub packets_out: Counter,
    pub bytes_out: Counter,
    pub tree_updates: Counter,
    pub bootstraps: Counter,
    pub bootstrap_acks: Counter,
    pub setups: Counter,
    pub teardowns: Counter,
    pub path_notifies: Counter,
    /// Recognized-but-unhandled and unknown packet types.
    pub ignored: Counter,
    /// Packets that failed decoding or verification (each one closes the link).
    pub rejected: Counter,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inbound(&self, len: usize) {
        self.packets_in.inc();
        self.bytes_in.add_len(len);
    }

    pub fn record_outbound(&self, len: usize) {
        self.packets_out.inc();
        self.bytes_out.add_len(len);
    }

    pub fn record_handled(&self, kind: HandledKind) {
        let counter = match kind {
            HandledKind::TreeInfo => &self.tree_updates,
            HandledKind::Bootstrap => &self.bootstraps,
            HandledKind::BootstrapAck => &self.bootstrap_acks,
            HandledKind::Setup => &self.setups,
            HandledKind::Teardown => &self.teardowns,
            HandledKind::PathNotify => &self.path_notifies,
        };
        counter.inc();
    }

    pub fn record_ignored(&self) {
        self.ignored.inc();
    }

    pub fn record_rejected(&self) {
        self.rejected.inc();
    }

    /// Copy every counter into a plain struct.
    pub fn snapshot(&self) -> LinkMetricsSnapshot {
        LinkMetricsSnapshot {
            packets_in: self.packets_in.get(),
            bytes_in: self.bytes_in.get(),
            packets_out: self.packets_out.get(),
            bytes_out: self.bytes_out.get(),
            tree_updates: self.tree_updates.get(),
            bootstraps: self.bootstraps.get(),
            bootstrap_acks: self.bootstrap_acks.get(),
            setups: self.setups.get(),
            teardowns: self.teardowns.get(),
            path_notifies: self.path_notifies.get(),
            ignored: self.ignored.get(),
            rejected: self.rejected.get(),
        }
    }
}

/// Point-in-time copy of [`LinkMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetricsSnapshot {
    pub packets_in: u64,
    pub bytes_in: u64,
    pub packets_out: u64,
    pub bytes_out: u64,
    pub tree_updates: u64,
    pub bootstraps: u64,
    pub bootstrap_acks: u64,
    pub setups: u64,
    pub teardowns: u64,
    pub path_notifies: u64,
    pub ignored: u64,
    pub rejected: u64,
}

impl LinkMetricsSnapshot {
    /// Packets that reached a handler, whatever their kind.
    pub fn handled(&self) -> u64 {
        self.tree_updates
            + self.bootstraps
            + self.bootstrap_acks
            + self.setups
            + self.teardowns
            + self.path_notifies
    }
}
