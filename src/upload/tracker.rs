use super::store::ChunkStore;
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Outcome of one chunk submission.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// More chunks are still expected.
    Pending,
    /// This submission completed the set. Returned exactly once per
    /// session; the holder owns the single reassembly attempt.
    Complete(CompletedUpload),
}

/// Claim token for the one reassembly run a completed session gets.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub session_id: String,
    pub total_chunks: u32,
    pub output_path: PathBuf,
    pub declared_size: Option<u64>,
}

#[derive(Debug, PartialEq, Eq)]
enum SessionStatus {
    Receiving,
    Reassembling,
}

#[derive(Debug)]
struct SessionState {
    expected_chunks: u32,
    received: HashSet<u32>,
    declared_size: Option<u64>,
    created_at: DateTime<Utc>,
    status: SessionStatus,
}

/// In-memory registry of in-flight upload sessions.
///
/// Sessions are independent: the registry lock is held only long enough to
/// fetch or insert a session entry, and all per-session work happens under
/// that session's own mutex. The transition from `Receiving` to
/// `Reassembling` is the atomic completion claim, so the final two chunks
/// racing each other still produce exactly one `Complete` outcome.
pub struct UploadTracker {
    store: Arc<ChunkStore>,
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionState>>>>,
}

impl UploadTracker {
    pub fn new(store: Arc<ChunkStore>) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Accept one chunk: persist its blob, record its index, and report
    /// whether the session just became complete.
    pub async fn submit_chunk(
        &self,
        session_id: &str,
        chunk_index: u32,
        total_chunks: u32,
        declared_size: Option<u64>,
        blob: &[u8],
    ) -> ServiceResult<ChunkOutcome> {
        validate_session_id(session_id)?;

        if total_chunks < 1 {
            return Err(ServiceError::ProtocolViolation(format!(
                "totalChunks must be at least 1, got {total_chunks}"
            )));
        }
        if chunk_index < 1 || chunk_index > total_chunks {
            return Err(ServiceError::ProtocolViolation(format!(
                "chunkIndex {chunk_index} outside 1..={total_chunks}"
            )));
        }

        let session = self.get_or_create(session_id, total_chunks, declared_size).await;

        // Validate metadata against the recorded session before touching
        // storage, so a violation leaves prior state untouched.
        {
            let state = session.lock().await;
            if state.expected_chunks != total_chunks {
                return Err(ServiceError::ProtocolViolation(format!(
                    "totalChunks {} does not match recorded {} for session {}",
                    total_chunks, state.expected_chunks, session_id
                )));
            }
            if state.status == SessionStatus::Reassembling {
                return Err(ServiceError::ProtocolViolation(format!(
                    "session {session_id} is already complete"
                )));
            }
        }

        // Blob persistence happens outside the session lock so concurrent
        // submissions for one session only serialize at the completion check.
        self.store.put_chunk(session_id, chunk_index, blob).await?;

        let mut state = session.lock().await;
        state.received.insert(chunk_index);

        if state.received.len() as u32 == state.expected_chunks
            && state.status == SessionStatus::Receiving
        {
            state.status = SessionStatus::Reassembling;
            info!(
                "session {} complete ({} chunks), claiming reassembly",
                session_id, state.expected_chunks
            );
            return Ok(ChunkOutcome::Complete(CompletedUpload {
                session_id: session_id.to_string(),
                total_chunks: state.expected_chunks,
                output_path: self.store.output_path(session_id),
                declared_size: state.declared_size,
            }));
        }

        Ok(ChunkOutcome::Pending)
    }

    /// Drop a session entry. Called by the reassembler once it has
    /// consumed (or failed to consume) the session's chunks.
    pub async fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }

    pub async fn is_tracked(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Incomplete sessions older than `max_age`, for an external reaper.
    pub async fn stale_sessions(&self, max_age: Duration) -> Vec<String> {
        let cutoff = Utc::now() - max_age;
        let sessions = self.sessions.read().await;

        let mut stale = Vec::new();
        for (id, session) in sessions.iter() {
            let state = session.lock().await;
            if state.status == SessionStatus::Receiving && state.created_at <= cutoff {
                stale.push(id.clone());
            }
        }
        stale
    }

    /// Evict an abandoned session and its chunk blobs.
    pub async fn evict(&self, session_id: &str) -> ServiceResult<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };

        if let Some(session) = session {
            let total = session.lock().await.expected_chunks;
            self.store.remove_chunks(session_id, total).await?;
            info!("evicted stale session {}", session_id);
        }
        Ok(())
    }

    async fn get_or_create(
        &self,
        session_id: &str,
        total_chunks: u32,
        declared_size: Option<u64>,
    ) -> Arc<Mutex<SessionState>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                return Arc::clone(session);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another submission may have created the entry between the locks.
        Arc::clone(sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(
                "new upload session {} expecting {} chunks",
                session_id, total_chunks
            );
            Arc::new(Mutex::new(SessionState {
                expected_chunks: total_chunks,
                received: HashSet::new(),
                declared_size,
                created_at: Utc::now(),
                status: SessionStatus::Receiving,
            }))
        }))
    }
}

/// Session ids become filenames; reject anything that could escape the
/// working directory.
pub(crate) fn validate_session_id(session_id: &str) -> ServiceResult<()> {
    if session_id.is_empty() {
        return Err(ServiceError::ProtocolViolation(
            "sessionId must not be empty".to_string(),
        ));
    }
    if session_id.contains(['/', '\\']) || session_id.contains("..") {
        return Err(ServiceError::ProtocolViolation(format!(
            "sessionId {session_id:?} contains path separators"
        )));
    }
    Ok(())
}
