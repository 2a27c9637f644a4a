//! Wire payload types for clipstream upload-service communication.
//!
//! The upload service exposes five operations: init session, send chunk,
//! complete session, query status, cancel session. This crate defines the
//! serde payload types for those operations; the actual transport (HTTP,
//! multipart framing, auth headers) is owned by the embedding app.

pub mod messages;
pub mod types;

pub use messages::{
    CancelSessionRequest, CompleteSessionRequest, CompleteSessionResponse, InitSessionRequest,
    InitSessionResponse, SendChunkRequest, SendChunkResponse, SessionStatusRequest,
    SessionStatusResponse,
};
pub use types::UploadDestination;
