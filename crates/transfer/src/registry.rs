use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use chunkyard_protocol::{ChunkAccepted, NEW_SESSION_ID, UploadCommitted};

use crate::session::UploadSession;
use crate::{DEFAULT_SESSION_TTL, TransferError, validate_destination_name};

/// In-memory table of live upload sessions.
///
/// Session directories and committed files all live under one content root
/// fixed at construction. The map lock is only held for lookups and
/// insert/remove; chunk I/O happens under the per-session lock.
pub struct SessionRegistry {
    content_root: PathBuf,
    ttl: TimeDelta,
    sessions: Mutex<HashMap<String, Arc<UploadSession>>>,
}

impl SessionRegistry {
    /// Creates a registry rooted at `content_root` with the default 24 h ttl.
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            ttl: TimeDelta::seconds(DEFAULT_SESSION_TTL.as_secs() as i64),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Sets how long new sessions accept chunks. Zero is rejected.
    pub fn with_ttl(mut self, ttl: Duration) -> Result<Self, TransferError> {
        if ttl.is_zero() {
            return Err(TransferError::InvalidTtl(ttl));
        }
        self.ttl = TimeDelta::from_std(ttl).map_err(|_| TransferError::InvalidTtl(ttl))?;
        Ok(self)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<UploadSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// Number of live (registered) sessions.
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Initializes a new session and registers it under its fresh id.
    ///
    /// Nothing is registered if the session directory cannot be created.
    pub fn create_session(&self) -> Result<Arc<UploadSession>, TransferError> {
        let session = Arc::new(UploadSession::initialize(&self.content_root, self.ttl)?);
        self.sessions()
            .insert(session.id().to_string(), Arc::clone(&session));

        tracing::info!(
            session = %session.id(),
            expires_at = %session.expires_at(),
            "upload session created"
        );
        Ok(session)
    }

    /// Returns the session registered under `id`.
    pub fn lookup(&self, id: &str) -> Option<Arc<UploadSession>> {
        self.sessions().get(id).cloned()
    }

    /// Removes `id` from the table. Removing an absent id is a no-op.
    ///
    /// Does not touch the session's files.
    pub fn retire(&self, id: &str) -> Option<Arc<UploadSession>> {
        self.sessions().remove(id)
    }

    fn resolve(&self, id: &str) -> Result<Arc<UploadSession>, TransferError> {
        self.lookup(id)
            .ok_or_else(|| TransferError::SessionNotFound(id.to_string()))
    }

    /// Accepts one chunk for `id` at the asserted `offset`.
    ///
    /// With `id == "0"` a new session is created and `data` becomes its
    /// first chunk; the asserted offset is ignored in that case. If that
    /// first chunk cannot be stored the new session is discarded again.
    pub fn put_chunk(
        &self,
        id: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<ChunkAccepted, TransferError> {
        if id == NEW_SESSION_ID {
            let session = self.create_session()?;
            return match session.accept(0, data) {
                Ok(offset) => Ok(ChunkAccepted {
                    id: session.id().to_string(),
                    offset,
                }),
                Err(e) => {
                    if let Err(cleanup) = session.cleanup() {
                        tracing::warn!(
                            session = %session.id(),
                            "cleanup after failed first chunk: {cleanup}"
                        );
                    }
                    self.retire(session.id());
                    Err(e)
                }
            };
        }

        let session = self.resolve(id)?;
        let offset = session.accept(offset, data).inspect_err(|e| {
            if let TransferError::OffsetConflict { offset: current, .. } = e {
                tracing::warn!(session = %id, asserted = offset, current, "offset conflict");
            }
        })?;
        Ok(ChunkAccepted {
            id: session.id().to_string(),
            offset,
        })
    }

    /// Assembles session `id` into `<content_root>/<name>` and retires it.
    ///
    /// A failed commit leaves the session registered with its chunks.
    pub fn commit(&self, id: &str, name: &str) -> Result<UploadCommitted, TransferError> {
        validate_destination_name(name)?;
        let session = self.resolve(id)?;

        let bytes = session.commit(&self.content_root.join(name))?;
        self.retire(id);

        Ok(UploadCommitted {
            id: session.id().to_string(),
            bytes,
            name: name.to_string(),
        })
    }

    /// Explicitly cleans up an abandoned session: deletes its chunks and
    /// retires it.
    pub fn discard(&self, id: &str) -> Result<(), TransferError> {
        let session = self.resolve(id)?;
        session.cleanup()?;
        self.retire(id);
        Ok(())
    }

    /// Discards every expired session. Returns the ids that were removed.
    ///
    /// Never called by the registry itself; expired sessions otherwise keep
    /// their chunks until committed or discarded.
    pub fn purge_expired(&self) -> Vec<String> {
        let expired: Vec<Arc<UploadSession>> = self
            .sessions()
            .values()
            .filter(|s| s.is_expired())
            .cloned()
            .collect();

        let mut purged = Vec::with_capacity(expired.len());
        for session in expired {
            match session.cleanup() {
                Ok(()) => {
                    self.retire(session.id());
                    purged.push(session.id().to_string());
                }
                Err(e) => {
                    tracing::warn!(
                        session = %session.id(),
                        "failed to purge expired session: {e}"
                    );
                }
            }
        }

        if !purged.is_empty() {
            tracing::info!(count = purged.len(), "purged expired sessions");
        }
        purged
    }
}
