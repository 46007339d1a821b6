use serde::{Deserialize, Serialize};

/// Event name every post change is published under
pub const POSTS_EVENT: &str = "posts";

/// WebSocket message from client
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ping to keep connection alive
    Ping,
}

/// WebSocket message to client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected { session_id: String },
    /// A published event, e.g. `posts`
    Event {
        event: String,
        data: serde_json::Value,
    },
    /// Error message
    Error { message: String },
    /// Pong response
    Pong,
}

/// What happened to a post
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostAction {
    Create,
    Update,
    Delete,
}

/// Payload of a `posts` event
#[derive(Debug, Serialize, Clone)]
pub struct ChangeNotification<P: Serialize> {
    pub action: PostAction,
    pub post: P,
}
