//! Error type for the transport contracts.

use thiserror::Error;

/// Errors surfaced by a [`crate::Connector`]/[`crate::Connection`]/
/// [`crate::Stream`]/[`crate::Writer`] implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("stream open failed: {0}")]
    StreamOpenFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("acknowledge failed: {0}")]
    AcknowledgeFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    #[error("topology declaration rejected: {0}")]
    TopologyRejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    /// Mirrors spec.md §7's "Context cancellation" error category.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}
