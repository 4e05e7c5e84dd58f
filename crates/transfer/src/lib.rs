//! Upload-session lifecycle and chunk-assembly engine.
//!
//! A [`SessionRegistry`] maps opaque session ids to live [`UploadSession`]s.
//! Each session owns a [`ChunkStore`] directory under the registry's content
//! root where every accepted chunk is persisted as its own file, named by
//! its starting offset. Committing a session concatenates the chunks in
//! arrival order into a destination file and retires the session.
//!
//! All I/O here is blocking; async callers should run these operations on a
//! blocking thread.

mod chunked;
mod registry;
mod session;
mod validation;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use chunked::{Chunk, ChunkReader, ChunkStore};
pub use registry::SessionRegistry;
pub use session::{SessionState, UploadSession};
pub use validation::validate_destination_name;

/// How long a session accepts chunks after it was created: 24 hours.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("storage error: {op} {}: {source}", path.display())]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize session directory {}: {source}", path.display())]
    Initialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session expired: {0}")]
    SessionExpired(String),

    #[error("offset conflict: session {id} is at offset {offset}")]
    OffsetConflict { id: String, offset: u64 },

    #[error("invalid destination name: {0}")]
    InvalidName(String),

    #[error("invalid session ttl: {0:?}")]
    InvalidTtl(Duration),
}

impl TransferError {
    pub(crate) fn storage(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Storage {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}
