use crate::types::PublicKey;

/// Decode and verification failures.
///
/// Every variant is fatal for the packet being processed; the owning peer
/// link is expected to close. Unknown packet types are not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("malformed varint: buffer ended before a terminating byte")]
    MalformedVarInt,

    #[error("malformed packet: {reason}")]
    MalformedPacket { reason: String },

    #[error("sender mismatch: packet claims {expected}, link peer is {actual}")]
    SenderMismatch {
        expected: PublicKey,
        actual: PublicKey,
    },

    #[error("signature verification failed at hop {hop}")]
    SignatureInvalid { hop: usize },
}

impl WireError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        WireError::MalformedPacket {
            reason: reason.into(),
        }
    }
}

/// Errors returned by a [`LinkHandle`](crate::link::LinkHandle).
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("link to {remote} is closed")]
    Closed { remote: PublicKey },

    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}
