//! Public upload surface: start, resume, cancel, batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipstream_protocol::types::UploadDestination;
use clipstream_transfer::{DEFAULT_CHUNK_SIZE, TransferError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::batch::{BatchEvent, BatchItem, BatchOutcome, BatchProgress, BatchState, run_batch};
use crate::error::UploadError;
use crate::service::UploadService;
use crate::session::SessionDriver;
use crate::state::{ProgressSnapshot, SessionState, UploadEvent};

/// Entry point for callers: owns the service connection and the fixed
/// chunk size every session uses.
pub struct Uploader {
    service: Arc<dyn UploadService>,
    chunk_size: u64,
}

impl Uploader {
    /// Creates an uploader with the default 4 MiB chunk size.
    pub fn new(service: Arc<dyn UploadService>) -> Self {
        Self {
            service,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Creates an uploader with an explicit chunk size (must be non-zero).
    pub fn with_chunk_size(
        service: Arc<dyn UploadService>,
        chunk_size: u64,
    ) -> Result<Self, UploadError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize.into());
        }
        Ok(Self {
            service,
            chunk_size,
        })
    }

    /// Starts a fresh upload and returns its handle.
    ///
    /// Local problems (missing destination, unreadable file) are rejected
    /// here, before any network call.
    pub fn start_upload(
        &self,
        path: impl Into<PathBuf>,
        destination: UploadDestination,
    ) -> Result<UploadHandle, UploadError> {
        if destination.project_id.is_empty() {
            return Err(UploadError::MissingDestination);
        }
        let path = path.into();
        let state = self.new_state(&path)?;

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(256);
        let driver = SessionDriver::new(
            Arc::clone(&self.service),
            Arc::clone(&state),
            cancel.clone(),
            tx,
        );
        let task = tokio::spawn(driver.run(path, destination));

        Ok(UploadHandle {
            state,
            cancel,
            events: Some(rx),
            task,
        })
    }

    /// Re-enters uploading for a session interrupted earlier, on the same
    /// session id. Chunks the service already holds are not re-sent.
    pub fn resume_upload(
        &self,
        session_id: &str,
        path: impl Into<PathBuf>,
    ) -> Result<UploadHandle, UploadError> {
        let path = path.into();
        let state = self.new_state(&path)?;

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(256);
        let driver = SessionDriver::new(
            Arc::clone(&self.service),
            Arc::clone(&state),
            cancel.clone(),
            tx,
        );
        let task = tokio::spawn(driver.run_resume(session_id.to_string(), path));

        Ok(UploadHandle {
            state,
            cancel,
            events: Some(rx),
            task,
        })
    }

    /// Uploads a batch of files sequentially; see [`BatchHandle`].
    ///
    /// Per-file problems (including files that vanish before their turn)
    /// are recorded as that file's outcome and never abort the batch.
    pub fn upload_all(&self, items: Vec<BatchItem>) -> BatchHandle {
        let states: Vec<Arc<SessionState>> = items
            .iter()
            .map(|item| {
                let size = std::fs::metadata(&item.path).map(|m| m.len()).unwrap_or(0);
                let name = file_name_of(&item.path);
                // A file whose plan cannot be taken starts out failed; the
                // batch records the outcome and moves on.
                let state = SessionState::new(name.clone(), size, self.chunk_size)
                    .unwrap_or_else(|e| {
                        SessionState::failed(name, size, self.chunk_size, &e.to_string())
                    });
                Arc::new(state)
            })
            .collect();

        let batch = Arc::new(BatchState::new(items.len()));
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(run_batch(
            Arc::clone(&self.service),
            items,
            states.clone(),
            Arc::clone(&batch),
            cancel.clone(),
            tx,
        ));

        BatchHandle {
            batch,
            sessions: states,
            cancel,
            events: Some(rx),
            task,
        }
    }

    fn new_state(&self, path: &Path) -> Result<Arc<SessionState>, UploadError> {
        let total_size = std::fs::metadata(path)?.len();
        Ok(Arc::new(SessionState::new(
            file_name_of(path),
            total_size,
            self.chunk_size,
        )?))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Handle to one running upload session.
#[derive(Debug)]
pub struct UploadHandle {
    state: Arc<SessionState>,
    cancel: CancellationToken,
    events: Option<mpsc::Receiver<UploadEvent>>,
    task: JoinHandle<Result<String, UploadError>>,
}

impl UploadHandle {
    /// Point-in-time progress view.
    pub fn progress(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }

    /// Service-assigned session id, once initialization succeeded.
    pub fn session_id(&self) -> Option<String> {
        self.state.session_id()
    }

    /// Requests cancellation. The session reaches the cancelled state
    /// promptly even if a request is in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events.take()
    }

    /// Waits for the terminal state and returns the result path.
    pub async fn wait(self) -> Result<String, UploadError> {
        self.task
            .await
            .map_err(|e| UploadError::Io(std::io::Error::other(e)))?
    }
}

/// Handle to one running batch.
pub struct BatchHandle {
    batch: Arc<BatchState>,
    sessions: Vec<Arc<SessionState>>,
    cancel: CancellationToken,
    events: Option<mpsc::Receiver<BatchEvent>>,
    task: JoinHandle<Vec<BatchOutcome>>,
}

impl BatchHandle {
    /// Aggregate batch progress.
    pub fn progress(&self) -> BatchProgress {
        self.batch.snapshot()
    }

    /// Per-file session states, in batch order, observable independently.
    pub fn sessions(&self) -> &[Arc<SessionState>] {
        &self.sessions
    }

    /// Cancels the in-flight session and marks the remaining files cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<BatchEvent>> {
        self.events.take()
    }

    /// Waits for every file to reach a terminal state.
    pub async fn wait(self) -> Vec<BatchOutcome> {
        self.task.await.unwrap_or_default()
    }
}
