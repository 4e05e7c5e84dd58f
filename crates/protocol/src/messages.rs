use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Success payloads
// ---------------------------------------------------------------------------

/// Reply to a chunk upload: the session id and its offset after the chunk.
///
/// A client that created a session with [`crate::NEW_SESSION_ID`] learns the
/// real id from this reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAccepted {
    pub id: String,
    #[serde(default)]
    pub offset: u64,
}

/// Reply to a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCommitted {
    pub id: String,
    /// Total size of the assembled file.
    #[serde(default)]
    pub bytes: u64,
    /// Destination file name, relative to the server's content root.
    pub name: String,
}

/// Reply to an explicit discard of an abandoned session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDiscarded {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body returned with every non-2xx status.
///
/// Offset conflicts fill `id` and `offset` with the session's real state so
/// the client can resend from the right position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            id: None,
            offset: None,
        }
    }

    /// Attaches the session's current position.
    pub fn with_position(mut self, id: impl Into<String>, offset: u64) -> Self {
        self.id = Some(id.into());
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::error_codes;

    #[test]
    fn chunk_accepted_field_names() {
        let ack = ChunkAccepted {
            id: "abc".into(),
            offset: 6,
        };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json, serde_json::json!({"id": "abc", "offset": 6}));
    }

    #[test]
    fn chunk_accepted_missing_offset_defaults_to_zero() {
        // Older servers omit zero values.
        let ack: ChunkAccepted = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(ack.offset, 0);
    }

    #[test]
    fn committed_field_names() {
        let resp = UploadCommitted {
            id: "abc".into(),
            bytes: 1024,
            name: "out.bin".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["bytes"], 1024);
        assert_eq!(json["name"], "out.bin");
    }

    #[test]
    fn error_without_position_omits_fields() {
        let err = ErrorResponse::new(error_codes::NOT_FOUND, "session not found");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("\"offset\""));
    }

    #[test]
    fn conflict_error_carries_position() {
        let err = ErrorResponse::new(error_codes::OFFSET_CONFLICT, "offset mismatch")
            .with_position("abc", 0);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["offset"], 0);
    }
}
