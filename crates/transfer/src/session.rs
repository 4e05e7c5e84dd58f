use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

use crate::TransferError;
use crate::chunked::ChunkStore;

/// Where a session is in its lifecycle.
///
/// Expiry is not a state: it is derived from the clock on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting chunks (unless expired).
    Active,
    /// Chunks assembled into the destination, storage removed.
    Committed,
    /// Explicitly cleaned up without committing.
    Discarded,
}

/// One in-progress upload (thread-safe).
///
/// Every mutating operation holds the session lock for its whole duration,
/// so concurrent requests for the same session are serialized and only one
/// of them can pass the offset check for a given offset.
pub struct UploadSession {
    id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    store: ChunkStore,
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    state: SessionState,
    /// Bytes accepted so far; always the sum of the chunk lengths.
    offset: u64,
    /// Chunk files in arrival order.
    chunks: Vec<PathBuf>,
}

impl UploadSession {
    /// Creates a session with a fresh id and its storage directory
    /// `<content_root>/<id>`.
    pub(crate) fn initialize(content_root: &Path, ttl: TimeDelta) -> Result<Self, TransferError> {
        let id = uuid::Uuid::new_v4().to_string();
        let dir = content_root.join(&id);
        let store = ChunkStore::create(dir.clone())
            .map_err(|source| TransferError::Initialization { path: dir, source })?;

        let created_at = Utc::now();
        Ok(Self {
            id,
            created_at,
            expires_at: created_at + ttl,
            store,
            inner: Mutex::new(SessionInner {
                state: SessionState::Active,
                offset: 0,
                chunks: Vec::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Directory holding this session's chunk files.
    pub fn storage_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Bytes accepted so far, which is also the next offset a client must send.
    pub fn offset(&self) -> u64 {
        self.lock().offset
    }

    /// Chunk files in arrival order.
    pub fn chunks(&self) -> Vec<PathBuf> {
        self.lock().chunks.clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Returns `true` once the validity window has elapsed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Durably stores `data` as the chunk starting at `offset`.
    ///
    /// `offset` is the position the caller believes it is writing at; it
    /// must equal the session's current offset. Returns the new offset.
    /// On error the offset and chunk list are unchanged, so the same chunk
    /// can be resent. An empty chunk is acknowledged without storing
    /// anything.
    pub fn accept(&self, offset: u64, data: &[u8]) -> Result<u64, TransferError> {
        let mut inner = self.lock();

        if inner.state != SessionState::Active {
            return Err(TransferError::SessionNotFound(self.id.clone()));
        }
        if self.is_expired() {
            return Err(TransferError::SessionExpired(self.id.clone()));
        }
        if offset != inner.offset {
            return Err(TransferError::OffsetConflict {
                id: self.id.clone(),
                offset: inner.offset,
            });
        }

        // A stored empty chunk would share its file name with the next one.
        if data.is_empty() {
            return Ok(inner.offset);
        }

        let path = self.store.write_chunk(offset, data)?;
        inner.chunks.push(path);
        inner.offset += data.len() as u64;

        tracing::debug!(
            session = %self.id,
            offset,
            bytes = data.len(),
            "chunk accepted"
        );
        Ok(inner.offset)
    }

    /// Assembles all chunks into `destination` and removes the session's
    /// storage directory. Returns the total number of bytes written.
    ///
    /// Expired sessions may still be committed. If assembly fails the
    /// destination is not touched and the session keeps its chunks, so the
    /// commit can be retried.
    pub fn commit(&self, destination: &Path) -> Result<u64, TransferError> {
        let mut inner = self.lock();

        if inner.state != SessionState::Active {
            return Err(TransferError::SessionNotFound(self.id.clone()));
        }

        let total = self.store.assemble(&inner.chunks, destination)?;
        inner.state = SessionState::Committed;
        inner.chunks.clear();

        // The destination is complete at this point; a leftover directory
        // only costs disk space.
        if let Err(e) = self.store.remove() {
            tracing::warn!(session = %self.id, "failed to remove session storage: {e}");
        }

        tracing::info!(
            session = %self.id,
            bytes = total,
            destination = %destination.display(),
            "upload committed"
        );
        Ok(total)
    }

    /// Discards the session without committing, deleting its chunks.
    ///
    /// A committed or already discarded session is left as is.
    pub fn cleanup(&self) -> Result<(), TransferError> {
        let mut inner = self.lock();

        if inner.state != SessionState::Active {
            return Ok(());
        }

        self.store.remove()?;
        inner.state = SessionState::Discarded;
        inner.chunks.clear();

        tracing::info!(session = %self.id, offset = inner.offset, "upload discarded");
        Ok(())
    }
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("id", &self.id)
            .field("expires_at", &self.expires_at)
            .field("storage_dir", &self.store.dir())
            .finish_non_exhaustive()
    }
}
