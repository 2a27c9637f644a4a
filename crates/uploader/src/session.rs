//! Per-session upload driver.
//!
//! Drives one file through init → chunk loop → complete against an
//! [`UploadService`], updating the shared [`SessionState`] and emitting
//! [`UploadEvent`]s. Chunks go out strictly in ascending index order, one in
//! flight at a time; the trade-off is latency on very large files, in
//! exchange for trivially deterministic service-side bookkeeping.

use std::path::PathBuf;
use std::sync::Arc;

use clipstream_protocol::messages::{
    CancelSessionRequest, CompleteSessionRequest, InitSessionRequest, SendChunkRequest,
    SessionStatusRequest,
};
use clipstream_protocol::types::UploadDestination;
use clipstream_transfer::ChunkReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::resume::missing_chunks;
use crate::service::UploadService;
use crate::state::{SessionState, UploadEvent};

/// Drives a single upload session to a terminal state.
pub struct SessionDriver {
    service: Arc<dyn UploadService>,
    state: Arc<SessionState>,
    cancel: CancellationToken,
    events: mpsc::Sender<UploadEvent>,
}

impl SessionDriver {
    pub fn new(
        service: Arc<dyn UploadService>,
        state: Arc<SessionState>,
        cancel: CancellationToken,
        events: mpsc::Sender<UploadEvent>,
    ) -> Self {
        Self {
            service,
            state,
            cancel,
            events,
        }
    }

    /// Runs a fresh upload to a terminal state and returns the result path.
    ///
    /// Remote failures land the session in the error phase; cancellation in
    /// the cancelled phase. Neither escapes as an unhandled fault.
    pub async fn run(
        self,
        path: PathBuf,
        destination: UploadDestination,
    ) -> Result<String, UploadError> {
        let result = self.drive(path, destination).await;
        self.finish(result).await
    }

    /// Re-enters uploading for an existing session, sending only the chunks
    /// the service has not acknowledged.
    pub async fn run_resume(
        self,
        session_id: String,
        path: PathBuf,
    ) -> Result<String, UploadError> {
        let result = self.drive_resume(session_id, path).await;
        self.finish(result).await
    }

    async fn drive(
        &self,
        path: PathBuf,
        destination: UploadDestination,
    ) -> Result<String, UploadError> {
        self.state.begin_init();
        self.emit_progress().await;
        self.check_cancelled()?;

        let reader = self.open_reader(path).await?;

        let req = InitSessionRequest {
            file_name: reader.file_name().to_string(),
            total_size: reader.total_size(),
            total_chunks: reader.chunk_count(),
            metadata: destination.to_metadata(),
        };
        let resp = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            r = self.service.init_session(req) => {
                r.map_err(|e| UploadError::Init(e.to_string()))?
            }
        };
        let session_id = resp.session_id;
        debug!(
            session = %session_id,
            file = %reader.file_name(),
            chunks = reader.chunk_count(),
            "session initialized"
        );

        self.state.begin_upload(session_id.clone());
        self.emit_progress().await;

        // A zero-byte file has an empty plan and goes straight to completion.
        let indices: Vec<u32> = (0..reader.chunk_count()).collect();
        self.send_chunks(reader, &session_id, &indices).await?;

        self.complete(&session_id).await
    }

    async fn drive_resume(
        &self,
        session_id: String,
        path: PathBuf,
    ) -> Result<String, UploadError> {
        self.state.begin_init();
        self.emit_progress().await;
        self.check_cancelled()?;

        let reader = self.open_reader(path).await?;

        let status_req = SessionStatusRequest {
            session_id: session_id.clone(),
        };
        let status = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            r = self.service.query_status(status_req) => {
                r.map_err(|e| UploadError::Status(e.to_string()))?
            }
        };

        if status.is_complete {
            // Everything already arrived; adopt the service's result and go
            // straight to complete without passing through uploading.
            self.state.set_session_id(session_id);
            return status
                .result_path
                .ok_or_else(|| UploadError::Status("complete session has no result path".into()));
        }

        if status.total_chunks != reader.chunk_count() {
            return Err(UploadError::Status(format!(
                "service reports {} chunks, local plan has {}",
                status.total_chunks,
                reader.chunk_count()
            )));
        }

        self.state.seed_acked(status.chunks_received.iter().copied());
        self.state.begin_upload(session_id.clone());
        self.emit_progress().await;

        let missing = missing_chunks(reader.chunk_count(), &status.chunks_received);
        info!(
            session = %session_id,
            held = status.chunks_received.len(),
            missing = missing.len(),
            "resuming upload"
        );
        self.send_chunks(reader, &session_id, &missing).await?;

        self.complete(&session_id).await
    }

    /// Sends the given chunk indices in order, one in flight at a time.
    ///
    /// Cancellation is polled before each read and raced against each
    /// in-flight request; a cancel that lands mid-request drops the request
    /// future rather than waiting for it.
    async fn send_chunks(
        &self,
        mut reader: ChunkReader,
        session_id: &str,
        indices: &[u32],
    ) -> Result<(), UploadError> {
        for &index in indices {
            self.check_cancelled()?;

            let (r, read_result) = tokio::task::spawn_blocking(move || {
                let payload = reader.read_chunk(index);
                (reader, payload)
            })
            .await
            .map_err(|e| UploadError::Io(std::io::Error::other(e)))?;
            reader = r;
            let payload = read_result?;

            let req = SendChunkRequest {
                session_id: session_id.to_string(),
                chunk_index: index,
                data: payload.data,
                checksum: payload.checksum,
            };
            let resp = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                r = self.service.send_chunk(req) => {
                    r.map_err(|e| UploadError::Chunk {
                        index,
                        reason: e.to_string(),
                    })?
                }
            };

            self.state.record_chunk(index);
            self.emit_progress().await;
            debug!(
                session = %session_id,
                chunk = index,
                received = resp.chunks_received,
                "chunk acknowledged"
            );

            // A cancel that landed while the request settled still wins:
            // the ack is recorded but no further chunk goes out.
            self.check_cancelled()?;
        }
        Ok(())
    }

    async fn complete(&self, session_id: &str) -> Result<String, UploadError> {
        self.state.begin_completing();
        self.emit_progress().await;
        self.check_cancelled()?;

        let req = CompleteSessionRequest {
            session_id: session_id.to_string(),
        };
        let resp = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            r = self.service.complete_session(req) => {
                r.map_err(|e| UploadError::Completion(e.to_string()))?
            }
        };
        Ok(resp.result_path)
    }

    /// Applies the drive outcome to the shared state and emits the
    /// terminal event. Returns the outcome unchanged for the caller.
    async fn finish(&self, result: Result<String, UploadError>) -> Result<String, UploadError> {
        match &result {
            Ok(path) => {
                self.state.complete(path.clone());
                self.emit_progress().await;
                let _ = self
                    .events
                    .send(UploadEvent::Completed {
                        result_path: path.clone(),
                    })
                    .await;
                info!(file = %self.state.file_name(), path = %path, "upload complete");
            }
            Err(UploadError::Cancelled) => {
                self.state.cancel();
                self.emit_progress().await;
                let _ = self.events.send(UploadEvent::Cancelled).await;
                info!(file = %self.state.file_name(), "upload cancelled");
                self.notify_cancel();
            }
            Err(e) => {
                let msg = e.to_string();
                self.state.fail(&msg);
                self.emit_progress().await;
                let _ = self
                    .events
                    .send(UploadEvent::Failed { error: msg.clone() })
                    .await;
                error!(file = %self.state.file_name(), error = %msg, "upload failed");
            }
        }
        result
    }

    /// Fires a best-effort cancel notice to the service. Local state is
    /// already cancelled; a delivery failure is only logged.
    fn notify_cancel(&self) {
        let Some(session_id) = self.state.session_id() else {
            return;
        };
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            let req = CancelSessionRequest {
                session_id: session_id.clone(),
            };
            if let Err(e) = service.cancel_session(req).await {
                warn!(session = %session_id, error = %e, "cancel notice failed");
            }
        });
    }

    async fn open_reader(&self, path: PathBuf) -> Result<ChunkReader, UploadError> {
        let chunk_size = self.state.chunk_size();
        tokio::task::spawn_blocking(move || ChunkReader::open(&path, chunk_size))
            .await
            .map_err(|e| UploadError::Io(std::io::Error::other(e)))?
            .map_err(UploadError::from)
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn emit_progress(&self) {
        let _ = self
            .events
            .send(UploadEvent::Progress(self.state.snapshot()))
            .await;
    }
}
