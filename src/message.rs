//! Message envelope delivered to connected clients.
//!
//! Messages are serialized as JSON objects whose field names are fixed by
//! the clients already consuming them:
//!
//! ```json
//! {"type":"chat","sender_id":"u2","receiver_id":"u1","conversation_id":"c9",
//!  "content":"hello","sender_role":"employer","sent_time":"2024-05-01T10:00:00Z",
//!  "metadata":{"job_id":"j7"}}
//! ```
//!
//! `metadata` is omitted when empty.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while converting a [`Message`] to or from JSON.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A transient message routed by [`Registry`](crate::registry::Registry).
///
/// Only `receiver_id` is interpreted; every other field passes through.
/// Absent fields decode as empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub conversation_id: String,
    #[serde(rename = "content")]
    pub payload: String,
    pub sender_role: String,
    #[serde(rename = "sent_time")]
    pub sent_at: String,
    #[serde(rename = "metadata", skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl Message {
    /// Create a message with empty correlation, role and timestamp fields.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    #[must_use]
    pub fn with_sender_role(mut self, role: impl Into<String>) -> Self {
        self.sender_role = role.into();
        self
    }

    #[must_use]
    pub fn with_sent_at(mut self, sent_at: impl Into<String>) -> Self {
        self.sent_at = sent_at.into();
        self
    }

    /// Add an extension attribute, serialized under `metadata`.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Serialize the message into a JSON frame.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Bytes, MessageError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(MessageError::Encode)
    }

    /// Parse a message from a JSON frame.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Decode`] if `bytes` is not a valid envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        serde_json::from_slice(bytes).map_err(MessageError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::Message;

    #[rstest]
    fn encodes_wire_field_names() {
        let message = Message::new("chat", "u2", "u1", "hello")
            .with_conversation("c9")
            .with_sender_role("employer")
            .with_sent_at("2024-05-01T10:00:00Z")
            .with_attribute("job_id", "j7");

        let bytes = message.encode().expect("encode failed");
        let value: Value = serde_json::from_slice(&bytes).expect("invalid json");
        assert_eq!(
            value,
            json!({
                "type": "chat",
                "sender_id": "u2",
                "receiver_id": "u1",
                "conversation_id": "c9",
                "content": "hello",
                "sender_role": "employer",
                "sent_time": "2024-05-01T10:00:00Z",
                "metadata": {"job_id": "j7"},
            })
        );
    }

    #[rstest]
    fn omits_empty_metadata() {
        let bytes = Message::new("status", "u2", "u1", "")
            .encode()
            .expect("encode failed");
        let value: Value = serde_json::from_slice(&bytes).expect("invalid json");
        assert!(value.get("metadata").is_none());
    }

    #[rstest]
    #[case::missing_metadata(r#"{"type":"chat","sender_id":"a","receiver_id":"b","conversation_id":"","content":"x","sender_role":"","sent_time":""}"#)]
    #[case::with_metadata(r#"{"type":"chat","sender_id":"a","receiver_id":"b","conversation_id":"","content":"x","sender_role":"","sent_time":"","metadata":{"k":"v"}}"#)]
    fn decodes_client_envelopes(#[case] raw: &str) {
        let message = Message::decode(raw.as_bytes()).expect("decode failed");
        assert_eq!(message.receiver_id, "b");
        assert_eq!(message.payload, "x");
    }

    #[rstest]
    fn rejects_truncated_frame() {
        assert!(Message::decode(br#"{"type":"chat""#).is_err());
    }
}
