//! Gateway inbound request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body the gateway accepts on its forwarding route.
///
/// The gateway resolves `function` to a live instance and forwards the
/// first request payload to that instance's message endpoint; the payload
/// itself is opaque to the control plane beyond this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// Target function name.
    pub function: String,

    /// Payloads to deliver; the gateway forwards the first one.
    #[serde(default)]
    pub requests: Vec<MessageRequest>,
}

/// One message payload forwarded to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRequest {
    pub user: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_shape() {
        let json = r#"{
            "function": "chat",
            "requests": [{
                "user": "u",
                "message": "hi",
                "timestamp": "2024-01-01T00:00:00Z",
                "recipients": []
            }]
        }"#;
        let req: ForwardRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.function, "chat");
        assert_eq!(req.requests[0].message, "hi");
        assert!(req.requests[0].recipients.is_empty());
    }

    #[test]
    fn requests_may_be_absent() {
        let req: ForwardRequest = serde_json::from_str(r#"{"function":"chat"}"#).unwrap();
        assert!(req.requests.is_empty());
    }
}
