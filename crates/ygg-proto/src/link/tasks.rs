//! The two pipelines of a link and the task that supervises them.
//!
//! Ingress handles one chunk to completion before reading the next, which
//! gives the transport natural backpressure. The stop signal is only observed
//! between chunks.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinError;
use ygg_metrics::LinkMetrics;

use crate::crypto::SignatureVerifier;
use crate::dispatch::{Dispatched, Dispatcher};
use crate::error::WireError;
use crate::packet::Encoder;
use crate::store::DhtStore;
use crate::types::PublicKey;

use super::{CloseReason, LinkClosed, LinkCommand};

pub(super) struct Ingress<V: ?Sized, S: ?Sized> {
    pub dispatcher: Dispatcher<V, S>,
    pub inbound: mpsc::Receiver<Bytes>,
    pub max_packet_size: usize,
    pub metrics: Arc<LinkMetrics>,
    pub stop: watch::Receiver<bool>,
}

impl<V, S> Ingress<V, S>
where
    V: SignatureVerifier + ?Sized,
    S: DhtStore + ?Sized,
{
    async fn run(mut self) -> CloseReason {
        let remote = *self.dispatcher.remote();
        loop {
            let chunk = tokio::select! {
                _ = self.stop.changed() => return CloseReason::Shutdown,
                chunk = self.inbound.recv() => match chunk {
                    Some(chunk) => chunk,
                    None => return CloseReason::TransportClosed,
                },
            };

            self.metrics.record_inbound(chunk.len());
            if chunk.len() > self.max_packet_size {
                self.metrics.record_rejected();
                return CloseReason::Protocol(WireError::MalformedPacket {
                    reason: format!(
                        "packet of {} bytes exceeds limit of {}",
                        chunk.len(),
                        self.max_packet_size
                    ),
                });
            }

            match self.dispatcher.dispatch(&chunk).await {
                Ok(Dispatched::Handled(kind)) => {
                    if let Some(handled) = kind.handled_kind() {
                        self.metrics.record_handled(handled);
                    }
                }
                Ok(ignored) => {
                    tracing::debug!(%remote, ?ignored, "link: packet ignored");
                    self.metrics.record_ignored();
                }
                Err(e) => {
                    self.metrics.record_rejected();
                    return CloseReason::Protocol(e);
                }
            }
        }
    }
}

pub(super) struct Egress {
    pub encoder: Encoder,
    pub commands: mpsc::Receiver<LinkCommand>,
    pub outbound: mpsc::Sender<Bytes>,
    pub metrics: Arc<LinkMetrics>,
    pub stop: watch::Receiver<bool>,
}

impl Egress {
    async fn run(mut self) -> CloseReason {
        loop {
            let cmd = tokio::select! {
                _ = self.stop.changed() => return CloseReason::Shutdown,
                cmd = self.commands.recv() => cmd,
            };

            // All handles dropped counts as a shutdown request.
            let Some(LinkCommand::Send { kind, payload }) = cmd else {
                return CloseReason::Shutdown;
            };

            let chunk = match kind {
                Some(kind) => self.encoder.encode_as(kind, &payload),
                None => self.encoder.encode(&payload),
            };
            let len = chunk.len();
            // A full transport must not keep the link alive after a stop.
            let sent = tokio::select! {
                _ = self.stop.changed() => return CloseReason::Shutdown,
                sent = self.outbound.send(chunk) => sent,
            };
            if sent.is_err() {
                return CloseReason::TransportClosed;
            }
            self.metrics.record_outbound(len);
        }
    }
}

enum FirstDone {
    Ingress(Result<CloseReason, JoinError>),
    Egress(Result<CloseReason, JoinError>),
}

/// Run both pipelines; when either stops, stop the other and report.
pub(super) async fn supervise<V, S>(
    remote: PublicKey,
    ingress: Ingress<V, S>,
    egress: Egress,
    stop_tx: watch::Sender<bool>,
    closed_tx: oneshot::Sender<LinkClosed>,
    metrics: Arc<LinkMetrics>,
) where
    V: SignatureVerifier + ?Sized + 'static,
    S: DhtStore + ?Sized + 'static,
{
    let mut ingress = tokio::spawn(ingress.run());
    let mut egress = tokio::spawn(egress.run());

    let first = tokio::select! {
        r = &mut ingress => FirstDone::Ingress(r),
        r = &mut egress => FirstDone::Egress(r),
    };
    let _ = stop_tx.send(true);

    let result = match first {
        FirstDone::Ingress(r) => {
            let _ = egress.await;
            r
        }
        FirstDone::Egress(r) => {
            let _ = ingress.await;
            r
        }
    };
    let reason = result.unwrap_or_else(|e| CloseReason::TaskFailed(e.to_string()));

    match &reason {
        CloseReason::Protocol(e) => tracing::warn!(%remote, "link: closed on protocol fault: {e}"),
        CloseReason::TaskFailed(e) => tracing::warn!(%remote, "link: task failed: {e}"),
        CloseReason::TransportClosed => tracing::info!(%remote, "link: transport closed"),
        CloseReason::Shutdown => tracing::info!(%remote, "link: shut down"),
    }

    let _ = closed_tx.send(LinkClosed {
        remote,
        reason,
        metrics: metrics.snapshot(),
    });
}
