//! Route configuration.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, put};
use chunkyard_protocol::constants::{ROUTE_DISCARD, ROUTE_HEALTH, ROUTE_UPLOAD_ITEM};
use chunkyard_transfer::SessionRegistry;
use tower_http::trace::TraceLayer;

use crate::handler;

/// Creates the application router.
///
/// `max_chunk_size` caps the request body of a single chunk upload.
pub fn create_router(registry: Arc<SessionRegistry>, max_chunk_size: usize) -> Router {
    Router::new()
        .route(
            ROUTE_UPLOAD_ITEM,
            put(handler::put_chunk).post(handler::commit),
        )
        .route(ROUTE_DISCARD, delete(handler::discard))
        .route(ROUTE_HEALTH, get(handler::health))
        .layer(DefaultBodyLimit::max(max_chunk_size))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}
