//! Wire types shared by the chunkyard upload server and its clients.
//!
//! Field names follow the legacy upload server JSON (`id`, `offset`,
//! `bytes`, `name`) so existing clients keep working.

pub mod constants;
pub mod messages;

pub use constants::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT, NEW_SESSION_ID};
pub use messages::{ChunkAccepted, ErrorResponse, UploadCommitted, UploadDiscarded};
