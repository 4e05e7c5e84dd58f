//! HTTP binding for the chunkyard upload engine.
//!
//! Routes requests to a shared [`SessionRegistry`], runs the blocking
//! storage work off the async runtime, and maps engine errors to HTTP
//! statuses with JSON bodies from `chunkyard-protocol`.
//!
//! | Method   | Path                     | Operation          |
//! |----------|--------------------------|--------------------|
//! | `PUT`    | `/upload/{id}/{offset}`  | accept a chunk     |
//! | `POST`   | `/upload/{id}/{name}`    | commit the session |
//! | `DELETE` | `/upload/{id}`           | discard a session  |
//! | `GET`    | `/health`                | liveness           |

mod error;
mod handler;
mod routes;
mod server;
mod sweep;

pub use chunkyard_transfer::SessionRegistry;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::{ServerConfig, UploadServer};

/// Default request body limit for a single chunk: 64 MiB.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Errors produced by the upload server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server already running")]
    AlreadyRunning,
}
