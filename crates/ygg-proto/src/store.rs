//! The routing-state seam.
//!
//! [`DhtStore`] receives every message this crate accepts. [`recording`]
//! holds an in-memory implementation that only records what it was given.

use crate::dht::{BootstrapAck, BootstrapMessage, PathNotifyMessage, SetupMessage, TeardownMessage};
use crate::tree::TreeInfo;

/// The DHT / spanning-tree state store.
///
/// Owns all long-lived routing state: the current tree position, outstanding
/// bootstraps and established paths keyed by `(key, root, root_seq)`. This
/// crate only decodes and validates packets, then hands them over here.
///
/// Invoked concurrently from every peer link's ingress task. Implementations
/// that are not safe for concurrent mutation must serialize per affected key
/// (tree root, or `(key, root, root_seq)` for paths).
#[async_trait::async_trait]
pub trait DhtStore: Send + Sync {
    /// Merge a fully verified tree advertisement.
    async fn update(&self, info: TreeInfo);

    async fn handle_bootstrap(&self, msg: BootstrapMessage);

    async fn handle_bootstrap_ack(&self, msg: BootstrapAck);

    /// Duplicate and stale `seq` values must be tolerated.
    async fn handle_setup(&self, msg: SetupMessage);

    async fn handle_teardown(&self, msg: TeardownMessage);

    async fn handle_path_notify(&self, msg: PathNotifyMessage);
}

// ── RecordingStore ───────────────────────────────────────────────────

/// A [`DhtStore`] that keeps every call in arrival order.
///
/// Holds no routing state. Useful in tests, and for watching what a link
/// delivers.
pub mod recording {
    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    /// One recorded store call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreCall {
        Update(TreeInfo),
        Bootstrap(BootstrapMessage),
        BootstrapAck(BootstrapAck),
        Setup(SetupMessage),
        Teardown(TeardownMessage),
        PathNotify(PathNotifyMessage),
    }

    /// Clones share one call log.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingStore {
        calls: Arc<Mutex<Vec<StoreCall>>>,
    }

    impl RecordingStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every call so far, oldest first.
        pub fn calls(&self) -> Vec<StoreCall> {
            self.log().clone()
        }

        fn push(&self, call: StoreCall) {
            self.log().push(call);
        }

        // A panic while holding the lock cannot leave the log half-written.
        fn log(&self) -> MutexGuard<'_, Vec<StoreCall>> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[async_trait::async_trait]
    impl DhtStore for RecordingStore {
        async fn update(&self, info: TreeInfo) {
            self.push(StoreCall::Update(info));
        }

        async fn handle_bootstrap(&self, msg: BootstrapMessage) {
            self.push(StoreCall::Bootstrap(msg));
        }

        async fn handle_bootstrap_ack(&self, msg: BootstrapAck) {
            self.push(StoreCall::BootstrapAck(msg));
        }

        async fn handle_setup(&self, msg: SetupMessage) {
            self.push(StoreCall::Setup(msg));
        }

        async fn handle_teardown(&self, msg: TeardownMessage) {
            self.push(StoreCall::Teardown(msg));
        }

        async fn handle_path_notify(&self, msg: PathNotifyMessage) {
            self.push(StoreCall::PathNotify(msg));
        }
    }
}
