//! Resumable chunked upload engine.
//!
//! Files are split into fixed-size chunks and pushed through an
//! [`UploadService`] one chunk at a time. Every session tracks its own
//! [`SessionState`], so progress can be observed and cancellation takes
//! effect mid-transfer. Interrupted sessions resume by asking the service
//! which chunks it already holds and sending only the rest.
//!
//! [`Uploader`] is the entry point: `start_upload` for a fresh session,
//! `resume_upload` to pick one up again, `upload_all` for a sequential
//! batch that survives per-file failures.

pub mod batch;
pub mod error;
pub mod resume;
pub mod service;
pub mod session;
pub mod state;
pub mod uploader;

#[cfg(test)]
mod testutil;

pub use batch::{BatchEvent, BatchItem, BatchOutcome, BatchProgress};
pub use error::{ServiceError, UploadError};
pub use resume::missing_chunks;
pub use service::{ServiceFuture, UploadService};
pub use session::SessionDriver;
pub use state::{ProgressSnapshot, SessionPhase, SessionState, UploadEvent};
pub use uploader::{BatchHandle, UploadHandle, Uploader};
