//! Request handlers.
//!
//! Each handler parses its path arguments, runs the registry call on a
//! blocking thread (chunk writes and assembly are synchronous disk I/O)
//! and returns the protocol reply as JSON.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use chunkyard_protocol::{ChunkAccepted, NEW_SESSION_ID, UploadCommitted, UploadDiscarded};
use chunkyard_transfer::{SessionRegistry, TransferError};

use crate::error::{ApiError, ApiResult};

/// `PUT /upload/{id}/{offset}`: stores the request body as the next chunk.
pub(crate) async fn put_chunk(
    State(registry): State<Arc<SessionRegistry>>,
    Path((id, offset)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<ChunkAccepted>> {
    let offset = parse_offset(&id, &offset)?;
    let ack = run_blocking(move || registry.put_chunk(&id, offset, &body)).await?;
    Ok(Json(ack))
}

/// `POST /upload/{id}/{name}`: assembles the session into `name`.
pub(crate) async fn commit(
    State(registry): State<Arc<SessionRegistry>>,
    Path((id, name)): Path<(String, String)>,
) -> ApiResult<Json<UploadCommitted>> {
    let receipt = run_blocking(move || registry.commit(&id, &name)).await?;
    Ok(Json(receipt))
}

/// `DELETE /upload/{id}`: drops an abandoned session and its chunks.
pub(crate) async fn discard(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UploadDiscarded>> {
    let discarded = id.clone();
    run_blocking(move || registry.discard(&id)).await?;
    Ok(Json(UploadDiscarded { id: discarded }))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

/// New sessions ignore the asserted offset, so a sentinel request never
/// fails on it.
fn parse_offset(id: &str, raw: &str) -> ApiResult<u64> {
    match raw.parse::<u64>() {
        Ok(offset) => Ok(offset),
        Err(_) if id == NEW_SESSION_ID => Ok(0),
        Err(_) => Err(ApiError::BadRequest(format!("invalid offset: {raw}"))),
    }
}

async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, TransferError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
}
