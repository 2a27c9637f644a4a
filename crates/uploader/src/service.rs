//! Abstract connection to the remote upload service.
//!
//! `UploadService` is implemented by the embedding app on top of its actual
//! HTTP client; using a trait keeps session logic decoupled from transport
//! and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use clipstream_protocol::messages::{
    CancelSessionRequest, CompleteSessionRequest, CompleteSessionResponse, InitSessionRequest,
    InitSessionResponse, SendChunkRequest, SendChunkResponse, SessionStatusRequest,
    SessionStatusResponse,
};

use crate::error::ServiceError;

/// Boxed future returned by [`UploadService`] operations.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// The four remote operations plus best-effort cancel, each a single
/// request/response with no internal retry policy.
///
/// Implementations must make `send_chunk` idempotent per
/// `(session_id, chunk_index)`: re-sending an already-acknowledged chunk
/// must not corrupt the session or grow the acknowledged set.
pub trait UploadService: Send + Sync {
    /// Creates a session for one file and returns its opaque identifier.
    fn init_session(&self, req: InitSessionRequest) -> ServiceFuture<'_, InitSessionResponse>;

    /// Transmits one chunk. On success exactly one additional chunk index
    /// is acknowledged service-side (or none, if the index was already in).
    fn send_chunk(&self, req: SendChunkRequest) -> ServiceFuture<'_, SendChunkResponse>;

    /// Finalizes a session; valid only once every chunk is acknowledged.
    fn complete_session(
        &self,
        req: CompleteSessionRequest,
    ) -> ServiceFuture<'_, CompleteSessionResponse>;

    /// Idempotent, side-effect-free query of the service's chunk inventory.
    fn query_status(&self, req: SessionStatusRequest) -> ServiceFuture<'_, SessionStatusResponse>;

    /// Best-effort cancellation notice. Local state never waits on this.
    fn cancel_session(&self, req: CancelSessionRequest) -> ServiceFuture<'_, ()>;
}
