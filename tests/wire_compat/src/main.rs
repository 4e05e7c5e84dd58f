fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chunkyard_protocol::{ChunkAccepted, ErrorResponse, UploadCommitted, UploadDiscarded};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn decode<T: serde::de::DeserializeOwned>(name: &str) -> T {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = decode(name);
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  Rust:    {reserialized}"
        );
    }

    // --- Success replies ---

    #[test]
    fn fixture_chunk_accepted() {
        roundtrip_test::<ChunkAccepted>("chunk_accepted.json");
    }

    #[test]
    fn fixture_upload_committed() {
        roundtrip_test::<UploadCommitted>("upload_committed.json");
    }

    #[test]
    fn fixture_upload_discarded() {
        roundtrip_test::<UploadDiscarded>("upload_discarded.json");
    }

    #[test]
    fn fixture_offset_conflict() {
        roundtrip_test::<ErrorResponse>("offset_conflict.json");
    }

    // --- Legacy server bodies (zero fields omitted) ---

    #[test]
    fn legacy_first_chunk_without_offset() {
        let ack: ChunkAccepted = decode("chunk_accepted_zero_offset.json");
        assert_eq!(ack.id, "1466a8fd2c3b5e70");
        assert_eq!(ack.offset, 0);

        // Zero offsets are written out explicitly.
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["offset"], 0);
    }

    #[test]
    fn legacy_conflict_body_yields_position() {
        let err: ErrorResponse = decode("legacy_conflict.json");
        assert!(err.code.is_empty());
        assert_eq!(err.id.as_deref(), Some("1466a8fd2c3b5e70"));
        assert_eq!(err.offset, Some(6));
    }

    #[test]
    fn legacy_empty_error_body() {
        let err: ErrorResponse = decode("legacy_error.json");
        assert!(err.id.is_none());
        assert!(err.offset.is_none());
    }

    #[test]
    fn committed_without_bytes_defaults_to_zero() {
        let resp: UploadCommitted =
            serde_json::from_str(r#"{"id":"1466a8fd2c3b5e70","name":"empty.bin"}"#).unwrap();
        assert_eq!(resp.bytes, 0);
        assert_eq!(resp.name, "empty.bin");
    }
}
