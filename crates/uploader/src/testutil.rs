//! Scripted in-memory upload service for tests.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clipstream_protocol::messages::{
    CancelSessionRequest, CompleteSessionRequest, CompleteSessionResponse, InitSessionRequest,
    InitSessionResponse, SendChunkRequest, SendChunkResponse, SessionStatusRequest,
    SessionStatusResponse,
};

use crate::error::ServiceError;
use crate::service::{ServiceFuture, UploadService};

/// Writes a test file and returns its path.
pub(crate) fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(data).unwrap();
    path
}

struct FakeSession {
    total_chunks: u32,
    received: BTreeSet<u32>,
    complete: bool,
    result_path: String,
}

#[derive(Default)]
struct FakeInner {
    sessions: HashMap<String, FakeSession>,
    next_id: u32,
    fail_init: bool,
    fail_chunk_at: Option<u32>,
    fail_complete: bool,
    hang_chunk_at: Option<u32>,
    init_calls: u32,
    chunk_log: Vec<(String, u32)>,
    complete_calls: u32,
    status_calls: u32,
    cancel_calls: Vec<String>,
}

/// Simulates the remote upload service: per-session chunk inventories,
/// idempotent chunk receipt per index, and scripted failure injection.
pub(crate) struct FakeService {
    inner: Mutex<FakeInner>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FakeInner::default()),
        }
    }

    pub fn fail_init(&self) {
        self.inner.lock().unwrap().fail_init = true;
    }

    pub fn fail_chunk_at(&self, index: u32) {
        self.inner.lock().unwrap().fail_chunk_at = Some(index);
    }

    pub fn fail_complete(&self) {
        self.inner.lock().unwrap().fail_complete = true;
    }

    /// Makes the send of `index` never resolve, for in-flight abort tests.
    pub fn hang_chunk_at(&self, index: u32) {
        self.inner.lock().unwrap().hang_chunk_at = Some(index);
    }

    /// Installs a pre-existing session, as left behind by an earlier
    /// interrupted transfer. Its result path is `/media/resume/<id>`.
    pub fn seed_session(&self, id: &str, total_chunks: u32, received: &[u32]) {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(
            id.to_string(),
            FakeSession {
                total_chunks,
                received: received.iter().copied().collect(),
                complete: false,
                result_path: format!("/media/resume/{id}"),
            },
        );
    }

    /// Installs a session the service considers fully complete.
    pub fn seed_complete_session(&self, id: &str, total_chunks: u32, result_path: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(
            id.to_string(),
            FakeSession {
                total_chunks,
                received: (0..total_chunks).collect(),
                complete: true,
                result_path: result_path.to_string(),
            },
        );
    }

    pub fn init_calls(&self) -> u32 {
        self.inner.lock().unwrap().init_calls
    }

    /// Chunk indices attempted, in send order (across all sessions).
    pub fn chunk_indices(&self) -> Vec<u32> {
        self.inner
            .lock()
            .unwrap()
            .chunk_log
            .iter()
            .map(|(_, i)| *i)
            .collect()
    }

    /// Chunk indices the service has acknowledged for a session, ascending.
    pub fn acked_chunks(&self, session_id: &str) -> Vec<u32> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(session_id)
            .map(|s| s.received.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn complete_calls(&self) -> u32 {
        self.inner.lock().unwrap().complete_calls
    }

    pub fn status_calls(&self) -> u32 {
        self.inner.lock().unwrap().status_calls
    }

    pub fn cancel_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().cancel_calls.clone()
    }
}

impl UploadService for FakeService {
    fn init_session(&self, req: InitSessionRequest) -> ServiceFuture<'_, InitSessionResponse> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.init_calls += 1;
            if inner.fail_init {
                return Err(ServiceError::Rejected("internal error (500)".into()));
            }
            inner.next_id += 1;
            let session_id = format!("sess_{}", inner.next_id);
            let project = req
                .metadata
                .get("projectId")
                .cloned()
                .unwrap_or_else(|| "default".to_string());
            inner.sessions.insert(
                session_id.clone(),
                FakeSession {
                    total_chunks: req.total_chunks,
                    received: BTreeSet::new(),
                    complete: false,
                    result_path: format!("/media/{project}/{}", req.file_name),
                },
            );
            Ok(InitSessionResponse { session_id })
        })
    }

    fn send_chunk(&self, req: SendChunkRequest) -> ServiceFuture<'_, SendChunkResponse> {
        Box::pin(async move {
            let hang = {
                let mut inner = self.inner.lock().unwrap();
                inner
                    .chunk_log
                    .push((req.session_id.clone(), req.chunk_index));
                inner.hang_chunk_at == Some(req.chunk_index)
            };
            if hang {
                std::future::pending::<()>().await;
            }

            let mut inner = self.inner.lock().unwrap();
            if inner.fail_chunk_at == Some(req.chunk_index) {
                return Err(ServiceError::Network("connection reset".into()));
            }
            let session = inner.sessions.get_mut(&req.session_id).ok_or_else(|| {
                ServiceError::Rejected(format!("unknown session {}", req.session_id))
            })?;
            if req.chunk_index >= session.total_chunks {
                return Err(ServiceError::Rejected(format!(
                    "chunk index {} out of range",
                    req.chunk_index
                )));
            }
            // Idempotent per (session, index): a re-send does not grow the set.
            session.received.insert(req.chunk_index);
            Ok(SendChunkResponse {
                chunks_received: session.received.len() as u32,
                is_complete: session.received.len() as u32 == session.total_chunks,
            })
        })
    }

    fn complete_session(
        &self,
        req: CompleteSessionRequest,
    ) -> ServiceFuture<'_, CompleteSessionResponse> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.complete_calls += 1;
            if inner.fail_complete {
                return Err(ServiceError::Rejected("chunk inventory incomplete".into()));
            }
            let session = inner.sessions.get_mut(&req.session_id).ok_or_else(|| {
                ServiceError::Rejected(format!("unknown session {}", req.session_id))
            })?;
            if session.received.len() as u32 != session.total_chunks {
                return Err(ServiceError::Rejected(format!(
                    "{} of {} chunks received",
                    session.received.len(),
                    session.total_chunks
                )));
            }
            session.complete = true;
            Ok(CompleteSessionResponse {
                result_path: session.result_path.clone(),
            })
        })
    }

    fn query_status(&self, req: SessionStatusRequest) -> ServiceFuture<'_, SessionStatusResponse> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.status_calls += 1;
            let session = inner.sessions.get(&req.session_id).ok_or_else(|| {
                ServiceError::Rejected(format!("unknown session {}", req.session_id))
            })?;
            Ok(SessionStatusResponse {
                total_chunks: session.total_chunks,
                chunks_received: session.received.iter().copied().collect(),
                is_complete: session.complete,
                result_path: session.complete.then(|| session.result_path.clone()),
            })
        })
    }

    fn cancel_session(&self, req: CancelSessionRequest) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.cancel_calls.push(req.session_id);
            Ok(())
        })
    }
}
