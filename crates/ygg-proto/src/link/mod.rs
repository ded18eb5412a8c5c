//! Per-peer-link driver.
//!
//! Composes the ingress stage ([`Dispatcher`]) and the egress stage
//! ([`Encoder`]) for one directly connected peer. The transport is a pair of
//! channels carrying complete packets; framing and connection setup happen
//! before the link is spawned.
//!
//! Any protocol fault on ingress closes the whole link. Reconnection and
//! blacklisting are the caller's decision, made from [`LinkClosed`].
mod tasks;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use ygg_metrics::{LinkMetrics, LinkMetricsSnapshot};

use crate::config::LinkConfig;
use crate::crypto::SignatureVerifier;
use crate::dispatch::Dispatcher;
use crate::error::{LinkError, WireError};
use crate::packet::{Encoder, PacketType};
use crate::store::DhtStore;
use crate::types::PublicKey;

// ── Close reporting ──────────────────────────────────────────────────

/// Why a link stopped.
#[derive(Debug, thiserror::Error)]
pub enum CloseReason {
    #[error("protocol violation: {0}")]
    Protocol(#[from] WireError),

    #[error("transport closed")]
    TransportClosed,

    #[error("shutdown requested")]
    Shutdown,

    #[error("link task failed: {0}")]
    TaskFailed(String),
}

impl CloseReason {
    /// Whether the peer misbehaved (as opposed to a local or transport stop).
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, CloseReason::Protocol(_))
    }
}

/// Final report of a link, delivered once.
#[derive(Debug)]
pub struct LinkClosed {
    pub remote: PublicKey,
    pub reason: CloseReason,
    pub metrics: LinkMetricsSnapshot,
}

// ── Commands (handle → egress) ───────────────────────────────────────

pub(crate) enum LinkCommand {
    Send {
        kind: Option<PacketType>,
        payload: Bytes,
    },
    Shutdown,
}

// ── LinkHandle ───────────────────────────────────────────────────────

/// Handle to a running link. Cheap to clone.
#[derive(Clone)]
pub struct LinkHandle {
    cmd_tx: mpsc::Sender<LinkCommand>,
    remote: PublicKey,
    metrics: Arc<LinkMetrics>,
}

impl LinkHandle {
    pub fn remote(&self) -> PublicKey {
        self.remote
    }

    /// Queue an application payload, tagged with the configured egress type.
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<(), LinkError> {
        self.command(LinkCommand::Send {
            kind: None,
            payload: payload.into(),
        })
        .await
    }

    /// Queue a payload with an explicit type tag.
    pub async fn send_typed(
        &self,
        kind: PacketType,
        payload: impl Into<Bytes>,
    ) -> Result<(), LinkError> {
        self.command(LinkCommand::Send {
            kind: Some(kind),
            payload: payload.into(),
        })
        .await
    }

    /// Stop both pipelines. Packets already queued for egress may be dropped.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(LinkCommand::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    pub fn metrics(&self) -> LinkMetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn command(&self, cmd: LinkCommand) -> Result<(), LinkError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| LinkError::Closed {
                remote: self.remote,
            })
    }
}

/// What [`PeerLink::spawn`] returns to the caller.
pub struct LinkChannels {
    pub handle: LinkHandle,
    /// Resolves once, when both pipelines have stopped.
    pub closed: oneshot::Receiver<LinkClosed>,
}

// ── PeerLink ─────────────────────────────────────────────────────────

/// Spawns the ingress and egress tasks for one peer.
pub struct PeerLink;

impl PeerLink {
    /// Start a link to `remote`.
    ///
    /// `inbound` yields one complete packet per item; `outbound` receives one
    /// encoded packet per item. Must be called inside a tokio runtime.
    pub fn spawn<V, S>(
        config: LinkConfig,
        remote: PublicKey,
        verifier: Arc<V>,
        store: Arc<S>,
        inbound: mpsc::Receiver<Bytes>,
        outbound: mpsc::Sender<Bytes>,
    ) -> LinkChannels
    where
        V: SignatureVerifier + ?Sized + 'static,
        S: DhtStore + ?Sized + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer.max(1));
        let (closed_tx, closed_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let metrics = Arc::new(LinkMetrics::new());

        let ingress = tasks::Ingress {
            dispatcher: Dispatcher::new(remote, verifier, store),
            inbound,
            max_packet_size: config.max_packet_size,
            metrics: metrics.clone(),
            stop: stop_rx.clone(),
        };
        let egress = tasks::Egress {
            encoder: Encoder::new(config.egress_type),
            commands: cmd_rx,
            outbound,
            metrics: metrics.clone(),
            stop: stop_rx,
        };

        tracing::info!(%remote, "link: started");
        tokio::spawn(tasks::supervise(
            remote,
            ingress,
            egress,
            stop_tx,
            closed_tx,
            metrics.clone(),
        ));

        LinkChannels {
            handle: LinkHandle {
                cmd_tx,
                remote,
                metrics,
            },
            closed: closed_rx,
        }
    }
}
