fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

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

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  Rust:    {reserialized}"
        );
    }

    // --- Request fixtures ---

    #[test]
    fn fixture_init_session_request() {
        roundtrip_test::<clipstream_protocol::InitSessionRequest>("init_session_request.json");
    }

    #[test]
    fn fixture_send_chunk_request() {
        roundtrip_test::<clipstream_protocol::SendChunkRequest>("send_chunk_request.json");
    }

    #[test]
    fn fixture_complete_session_request() {
        roundtrip_test::<clipstream_protocol::CompleteSessionRequest>(
            "complete_session_request.json",
        );
    }

    #[test]
    fn fixture_session_status_request() {
        roundtrip_test::<clipstream_protocol::SessionStatusRequest>("session_status_request.json");
    }

    #[test]
    fn fixture_cancel_session_request() {
        roundtrip_test::<clipstream_protocol::CancelSessionRequest>("cancel_session_request.json");
    }

    // --- Response fixtures ---

    #[test]
    fn fixture_init_session_response() {
        roundtrip_test::<clipstream_protocol::InitSessionResponse>("init_session_response.json");
    }

    #[test]
    fn fixture_send_chunk_response() {
        roundtrip_test::<clipstream_protocol::SendChunkResponse>("send_chunk_response.json");
    }

    #[test]
    fn fixture_complete_session_response() {
        roundtrip_test::<clipstream_protocol::CompleteSessionResponse>(
            "complete_session_response.json",
        );
    }

    #[test]
    fn fixture_session_status_response() {
        roundtrip_test::<clipstream_protocol::SessionStatusResponse>(
            "session_status_response.json",
        );
    }

    #[test]
    fn fixture_session_status_response_complete() {
        roundtrip_test::<clipstream_protocol::SessionStatusResponse>(
            "session_status_response_complete.json",
        );
    }

    #[test]
    fn fixture_upload_destination() {
        roundtrip_test::<clipstream_protocol::UploadDestination>("upload_destination.json");
    }

    // --- Chunk data decodes to the original bytes ---

    #[test]
    fn send_chunk_fixture_data_decodes() {
        let fixture = load_fixture("send_chunk_request.json");
        let req: clipstream_protocol::SendChunkRequest =
            serde_json::from_value(fixture).unwrap();
        assert_eq!(req.data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(req.chunk_index, 7);
    }

    // --- Backward compatibility: older services omit optional fields ---

    #[test]
    fn legacy_status_response_no_inventory() {
        let json = r#"{
            "totalChunks": 12,
            "isComplete": false
        }"#;
        let resp: clipstream_protocol::SessionStatusResponse =
            serde_json::from_str(json).unwrap();
        assert!(
            resp.chunks_received.is_empty(),
            "missing chunksReceived should default to empty vec"
        );
        assert!(
            resp.result_path.is_none(),
            "missing resultPath should default to None"
        );
    }

    #[test]
    fn legacy_chunk_request_no_checksum() {
        let json = r#"{
            "sessionId": "sess_9",
            "chunkIndex": 0,
            "data": "AAAA"
        }"#;
        let req: clipstream_protocol::SendChunkRequest = serde_json::from_str(json).unwrap();
        assert!(
            req.checksum.is_empty(),
            "missing checksum should default to empty"
        );
    }

    #[test]
    fn legacy_init_request_no_metadata() {
        let json = r#"{
            "fileName": "raw.mov",
            "totalSize": 4096,
            "totalChunks": 1
        }"#;
        let req: clipstream_protocol::InitSessionRequest = serde_json::from_str(json).unwrap();
        assert!(
            req.metadata.is_empty(),
            "missing metadata should default to empty map"
        );
    }
}
