//! Sequential multi-file orchestration.
//!
//! Drives one session per file, in order; a file's failure is recorded and
//! the batch moves on. The orchestrator itself never enters an error state,
//! only individual sessions do.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use clipstream_protocol::types::UploadDestination;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::UploadError;
use crate::service::UploadService;
use crate::session::SessionDriver;
use crate::state::{SessionState, UploadEvent};

/// One file queued for a batch upload.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub path: PathBuf,
    pub destination: UploadDestination,
}

/// Terminal outcome of one file within a batch.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Completed { result_path: String },
    Failed { error: String },
    Cancelled,
}

impl BatchOutcome {
    /// The storage path, for completed files only.
    pub fn result_path(&self) -> Option<&str> {
        match self {
            BatchOutcome::Completed { result_path } => Some(result_path),
            _ => None,
        }
    }
}

/// Lifecycle event emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    FileStarted { index: usize, file_name: String },
    Progress(BatchProgress),
    FileFinished { index: usize, outcome: BatchOutcome },
}

/// Aggregate view of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total_files: usize,
    /// Files that reached any terminal state.
    pub finished_files: usize,
    /// Files that completed successfully.
    pub completed_files: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<usize>,
    /// `round(100 × (finished_files + current_fraction) / total_files)`.
    pub percentage: u8,
}

pub(crate) struct BatchState {
    inner: RwLock<BatchInner>,
}

struct BatchInner {
    total: usize,
    finished: usize,
    completed: usize,
    current: Option<usize>,
    current_pct: u8,
}

impl BatchState {
    pub fn new(total: usize) -> Self {
        Self {
            inner: RwLock::new(BatchInner {
                total,
                finished: 0,
                completed: 0,
                current: None,
                current_pct: 0,
            }),
        }
    }

    fn start_file(&self, index: usize) {
        let mut s = self.inner.write().unwrap();
        s.current = Some(index);
        s.current_pct = 0;
    }

    fn file_progress(&self, percentage: u8) {
        let mut s = self.inner.write().unwrap();
        s.current_pct = percentage;
    }

    fn finish_file(&self, success: bool) {
        let mut s = self.inner.write().unwrap();
        s.finished += 1;
        if success {
            s.completed += 1;
        }
        s.current = None;
        s.current_pct = 0;
    }

    pub fn snapshot(&self) -> BatchProgress {
        let s = self.inner.read().unwrap();
        let percentage = if s.total == 0 {
            100
        } else {
            let units = s.finished as f64 + f64::from(s.current_pct) / 100.0;
            ((units / s.total as f64) * 100.0).round() as u8
        };
        BatchProgress {
            total_files: s.total,
            finished_files: s.finished,
            completed_files: s.completed,
            current_file: s.current,
            percentage,
        }
    }
}

/// Drives the whole batch sequentially. File *i+1* does not begin until
/// file *i* is terminal.
pub(crate) async fn run_batch(
    service: Arc<dyn UploadService>,
    items: Vec<BatchItem>,
    states: Vec<Arc<SessionState>>,
    batch: Arc<BatchState>,
    cancel: CancellationToken,
    events: mpsc::Sender<BatchEvent>,
) -> Vec<BatchOutcome> {
    let mut outcomes = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let state = Arc::clone(&states[index]);

        if cancel.is_cancelled() {
            state.cancel();
            batch.finish_file(false);
            let outcome = BatchOutcome::Cancelled;
            let _ = events
                .send(BatchEvent::FileFinished {
                    index,
                    outcome: outcome.clone(),
                })
                .await;
            outcomes.push(outcome);
            continue;
        }

        batch.start_file(index);
        let _ = events
            .send(BatchEvent::FileStarted {
                index,
                file_name: state.file_name(),
            })
            .await;

        let outcome = run_one(&service, item, state, &batch, &cancel, &events).await;

        match &outcome {
            BatchOutcome::Completed { result_path } => {
                info!(file = index, path = %result_path, "batch file uploaded");
            }
            BatchOutcome::Failed { error } => {
                warn!(file = index, error = %error, "batch file failed; continuing");
            }
            BatchOutcome::Cancelled => {
                info!(file = index, "batch file cancelled");
            }
        }

        batch.finish_file(matches!(outcome, BatchOutcome::Completed { .. }));
        let _ = events.send(BatchEvent::Progress(batch.snapshot())).await;
        let _ = events
            .send(BatchEvent::FileFinished {
                index,
                outcome: outcome.clone(),
            })
            .await;
        outcomes.push(outcome);
    }

    outcomes
}

async fn run_one(
    service: &Arc<dyn UploadService>,
    item: BatchItem,
    state: Arc<SessionState>,
    batch: &Arc<BatchState>,
    cancel: &CancellationToken,
    events: &mpsc::Sender<BatchEvent>,
) -> BatchOutcome {
    // Local validation failures are recorded without any network traffic.
    if item.destination.project_id.is_empty() {
        let msg = UploadError::MissingDestination.to_string();
        state.fail(&msg);
        return BatchOutcome::Failed { error: msg };
    }

    let (tx, mut rx) = mpsc::channel(256);
    let driver = SessionDriver::new(
        Arc::clone(service),
        state,
        cancel.child_token(),
        tx,
    );
    let task = tokio::spawn(driver.run(item.path, item.destination));

    // Relay the session's progress into the aggregate view while it runs.
    while let Some(event) = rx.recv().await {
        if let UploadEvent::Progress(snap) = event {
            batch.file_progress(snap.percentage);
            let _ = events.send(BatchEvent::Progress(batch.snapshot())).await;
        }
    }

    match task.await {
        Ok(Ok(result_path)) => BatchOutcome::Completed { result_path },
        Ok(Err(UploadError::Cancelled)) => BatchOutcome::Cancelled,
        Ok(Err(e)) => BatchOutcome::Failed {
            error: e.to_string(),
        },
        Err(e) => BatchOutcome::Failed {
            error: format!("task join error: {e}"),
        },
    }
}
