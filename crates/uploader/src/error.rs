//! Upload error taxonomy.

/// Error returned by an [`UploadService`](crate::service::UploadService)
/// implementation for a single remote operation.
///
/// The service layer performs no retries; it reports one outcome per request.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service received the request and refused it (quota, unknown
    /// session, invalid metadata, chunk inventory disagreement).
    #[error("rejected by service: {0}")]
    Rejected(String),

    /// The request never produced a response (connection refused, reset,
    /// timeout enforced by the transport layer).
    #[error("network error: {0}")]
    Network(String),
}

/// Errors produced while driving an upload session.
///
/// `Cancelled` is a normal terminal outcome, not a failure; sessions that end
/// with it land in the cancelled phase, never the error phase.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("session init failed: {0}")]
    Init(String),

    #[error("chunk {index} transfer failed: {reason}")]
    Chunk { index: u32, reason: String },

    #[error("session completion failed: {0}")]
    Completion(String),

    #[error("status query failed: {0}")]
    Status(String),

    #[error("cancelled")]
    Cancelled,

    #[error("upload destination is missing a project id")]
    MissingDestination,

    #[error("transfer error: {0}")]
    Transfer(#[from] clipstream_transfer::TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Returns `true` for the cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadError::Cancelled)
    }
}
