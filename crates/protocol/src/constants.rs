/// Session id a client sends to open a new upload session.
pub const NEW_SESSION_ID: &str = "0";

/// Default HTTP port of the upload server.
pub const DEFAULT_PORT: u16 = 19502;

/// Chunk size used by clients when none is configured (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Per-session item route. `item` is the asserted offset for
/// `PUT /upload/{id}/{offset}` (chunk upload) and the destination name for
/// `POST /upload/{id}/{name}` (commit).
pub const ROUTE_UPLOAD_ITEM: &str = "/upload/{id}/{item}";

/// Route discarding a session: `DELETE /upload/{id}`.
pub const ROUTE_DISCARD: &str = "/upload/{id}";

/// Liveness probe.
pub const ROUTE_HEALTH: &str = "/health";

/// Machine-readable error codes carried in [`crate::ErrorResponse::code`].
pub mod error_codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const EXPIRED: &str = "session_expired";
    pub const OFFSET_CONFLICT: &str = "offset_conflict";
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INTERNAL: &str = "internal_error";
}
