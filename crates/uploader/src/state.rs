//! Session state record and progress snapshots.

use std::collections::BTreeSet;
use std::sync::RwLock;

use clipstream_transfer::{TransferError, chunk_count};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of one upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "initializing")]
    Initializing,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "completing")]
    Completing,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl SessionPhase {
    /// Complete, error and cancelled admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Complete | SessionPhase::Error | SessionPhase::Cancelled
        )
    }
}

/// Point-in-time view of a session, safe to hand to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub status: SessionPhase,
    pub uploaded_size: u64,
    pub total_size: u64,
    /// `round(100 × uploaded / total)`; 0 for an empty file until complete.
    pub percentage: u8,
    pub chunks_uploaded: u32,
    pub chunks_total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
}

/// Lifecycle event emitted by a session driver.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Progress(ProgressSnapshot),
    Completed { result_path: String },
    Failed { error: String },
    Cancelled,
}

/// Tracks one file's transfer attempt (thread-safe).
///
/// Mutators enforce the state machine's invariants: acknowledged chunk
/// indices stay within range, terminal phases are never overwritten, and a
/// complete session always carries a result path plus a full chunk set.
#[derive(Debug)]
pub struct SessionState {
    inner: RwLock<StateInner>,
}

#[derive(Debug)]
struct StateInner {
    phase: SessionPhase,
    session_id: Option<String>,
    file_name: String,
    total_size: u64,
    chunk_size: u64,
    total_chunks: u32,
    acked: BTreeSet<u32>,
    error: Option<String>,
    result_path: Option<String>,
}

impl SessionState {
    /// Creates an idle session record. Fails if the file's chunk plan cannot
    /// be taken (zero chunk size, or more chunks than a u32 can index).
    pub fn new(file_name: String, total_size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        let total_chunks = chunk_count(total_size, chunk_size)?;
        Ok(Self {
            inner: RwLock::new(StateInner {
                phase: SessionPhase::Idle,
                session_id: None,
                file_name,
                total_size,
                chunk_size,
                total_chunks,
                acked: BTreeSet::new(),
                error: None,
                result_path: None,
            }),
        })
    }

    /// Creates a record already in the error phase, for a file whose chunk
    /// plan could not be taken.
    pub fn failed(file_name: String, total_size: u64, chunk_size: u64, error: &str) -> Self {
        Self {
            inner: RwLock::new(StateInner {
                phase: SessionPhase::Error,
                session_id: None,
                file_name,
                total_size,
                chunk_size,
                total_chunks: 0,
                acked: BTreeSet::new(),
                error: Some(error.to_string()),
                result_path: None,
            }),
        }
    }

    /// idle → initializing.
    pub fn begin_init(&self) {
        let mut s = self.inner.write().unwrap();
        if !s.phase.is_terminal() {
            s.phase = SessionPhase::Initializing;
        }
    }

    /// Records the service session id without a phase change, for sessions
    /// that never enter the uploading phase (resume of a finished session).
    pub fn set_session_id(&self, session_id: String) {
        let mut s = self.inner.write().unwrap();
        if !s.phase.is_terminal() {
            s.session_id = Some(session_id);
        }
    }

    /// initializing → uploading, recording the service-assigned id.
    pub fn begin_upload(&self, session_id: String) {
        let mut s = self.inner.write().unwrap();
        if !s.phase.is_terminal() {
            s.session_id = Some(session_id);
            s.phase = SessionPhase::Uploading;
        }
    }

    /// Seeds already-acknowledged chunks before a resume re-entry, so
    /// progress never regresses below what the service already holds.
    pub fn seed_acked<I: IntoIterator<Item = u32>>(&self, indices: I) {
        let mut s = self.inner.write().unwrap();
        let total = s.total_chunks;
        s.acked.extend(indices.into_iter().filter(|i| *i < total));
    }

    /// Records one acknowledged chunk. Out-of-range indices are ignored.
    pub fn record_chunk(&self, index: u32) {
        let mut s = self.inner.write().unwrap();
        if index < s.total_chunks {
            s.acked.insert(index);
        }
    }

    /// uploading → completing.
    pub fn begin_completing(&self) {
        let mut s = self.inner.write().unwrap();
        if !s.phase.is_terminal() {
            s.phase = SessionPhase::Completing;
        }
    }

    /// Enters the complete phase with the service-reported storage path.
    ///
    /// Fills the acknowledged set: complete implies every chunk is in.
    pub fn complete(&self, result_path: String) {
        let mut s = self.inner.write().unwrap();
        if s.phase.is_terminal() {
            return;
        }
        s.phase = SessionPhase::Complete;
        s.result_path = Some(result_path);
        s.acked = (0..s.total_chunks).collect();
    }

    /// Enters the error phase with a human-readable cause.
    pub fn fail(&self, error: &str) {
        let mut s = self.inner.write().unwrap();
        if s.phase.is_terminal() {
            return;
        }
        s.phase = SessionPhase::Error;
        s.error = Some(error.to_string());
    }

    /// Enters the cancelled phase.
    pub fn cancel(&self) {
        let mut s = self.inner.write().unwrap();
        if s.phase.is_terminal() {
            return;
        }
        s.phase = SessionPhase::Cancelled;
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.read().unwrap().phase
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.read().unwrap().session_id.clone()
    }

    pub fn file_name(&self) -> String {
        self.inner.read().unwrap().file_name.clone()
    }

    pub fn total_chunks(&self) -> u32 {
        self.inner.read().unwrap().total_chunks
    }

    pub fn chunk_size(&self) -> u64 {
        self.inner.read().unwrap().chunk_size
    }

    /// Returns a point-in-time progress view.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let s = self.inner.read().unwrap();
        let uploaded_size = uploaded_bytes(&s);
        let percentage = if s.total_size == 0 {
            if s.phase == SessionPhase::Complete { 100 } else { 0 }
        } else {
            ((uploaded_size as f64 / s.total_size as f64) * 100.0).round() as u8
        };
        ProgressSnapshot {
            status: s.phase,
            uploaded_size,
            total_size: s.total_size,
            percentage,
            chunks_uploaded: s.acked.len() as u32,
            chunks_total: s.total_chunks,
            error: s.error.clone(),
            result_path: s.result_path.clone(),
        }
    }
}

/// Exact byte total of the acknowledged chunks.
///
/// Every chunk is `chunk_size` bytes except the final one, which only spans
/// the remainder of the file.
fn uploaded_bytes(s: &StateInner) -> u64 {
    let mut uploaded = s.acked.len() as u64 * s.chunk_size;
    if s.total_chunks > 0 && s.acked.contains(&(s.total_chunks - 1)) {
        let last_start = u64::from(s.total_chunks - 1) * s.chunk_size;
        let last_len = s.total_size - last_start;
        uploaded = uploaded - s.chunk_size + last_len;
    }
    uploaded.min(s.total_size)
}
