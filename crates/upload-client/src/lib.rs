//! Resumable chunked upload client for chunkyard servers.
//!
//! Streams a local file to an upload server one chunk per request, follows
//! the server's reported offset on conflicts, and commits the session at
//! end of file.

pub mod client;

pub use client::{ClientError, PutOutcome, UploadClient};
