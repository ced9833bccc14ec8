//! Builders for connections and messages used across tests.

use bytes::Bytes;
use fanout::{ConnectionHandle, Message, Outbound};

/// Build a connection for `user_id` with a buffer of `capacity` frames.
///
/// # Panics
///
/// Panics if `user_id` is empty or `capacity` is out of range.
pub fn connect(user_id: &str, capacity: usize) -> (ConnectionHandle, Outbound) {
    ConnectionHandle::builder(user_id, "candidate")
        .capacity(capacity)
        .build()
        .expect("failed to build connection")
}

/// A chat message from `sender` to `receiver`.
pub fn chat(sender: &str, receiver: &str, content: &str) -> Message {
    Message::new("chat", sender, receiver, content)
        .with_conversation(format!("{sender}:{receiver}"))
        .with_sender_role("employer")
        .with_sent_at("2024-05-01T10:00:00Z")
}

/// Take every frame currently queued on `outbound` and decode it.
///
/// # Panics
///
/// Panics if a queued frame is not a valid message.
pub fn decode_all(outbound: &mut Outbound) -> Vec<Message> {
    std::iter::from_fn(|| outbound.try_recv())
        .map(|frame: Bytes| Message::decode(&frame).expect("queued frame is not a message"))
        .collect()
}
