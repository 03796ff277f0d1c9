use serde::{Deserialize, Serialize};

/// Typed view of one completed poll result.
///
/// The companion reports each finished drop as a JSON envelope:
///
/// ```json
/// { "requestID": 1234, "data": { ... } }
/// ```
///
/// The dispatcher hands poll bodies to handlers as raw bytes; this type is
/// an optional convenience for hosts that want the envelope parsed. The
/// `data` contents stay schemaless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedRequest {
    /// The id the host chose when submitting the drop.
    #[serde(rename = "requestID")]
    pub request_id: i16,
    /// Result payload; semantics belong to the companion.
    pub data: serde_json::Value,
}

impl CompletedRequest {
    /// Parse a poll result body.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_envelope() {
        let body = br#"{"requestID":1234,"data":{"pieceURL":"https://example.com/p/1"}}"#;
        let completed = CompletedRequest::from_slice(body).unwrap();
        assert_eq!(completed.request_id, 1234);
        assert_eq!(completed.data["pieceURL"], "https://example.com/p/1");
    }

    #[test]
    fn rejects_non_envelope_body() {
        assert!(CompletedRequest::from_slice(b"[]").is_err());
        assert!(CompletedRequest::from_slice(b"not json").is_err());
    }

    #[test]
    fn roundtrips_through_serde() {
        let completed = CompletedRequest {
            request_id: -3,
            data: serde_json::json!({"ok": true}),
        };
        let encoded = serde_json::to_vec(&completed).unwrap();
        assert_eq!(CompletedRequest::from_slice(&encoded).unwrap(), completed);
    }
}
