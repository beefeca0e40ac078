//! Wire events exchanged with the chat UI
//!
//! Server-to-client events form a closed tagged union so the seven kinds
//! are exhaustively checkable on both ends. The `type` field is the
//! discriminator, matching what the frontend switches on.

use serde::{Deserialize, Serialize};

/// Server-to-client event pushed over the duplex channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// Connection acknowledgement, sent once after the socket upgrades
    Connect { status: String },
    /// Complete assistant reply (non-streaming delivery)
    AgentMessage { content: String },
    /// Opens a streamed assistant reply
    AgentMessageStreamStart,
    /// One fragment of a streamed reply, in emission order
    AgentMessageStreamChunk { content: String },
    /// Closes a streamed assistant reply
    AgentMessageStreamEnd,
    /// Tool/action notification for the UI action log
    AgentAction { action: String, details: String },
    /// Screenshot push; replaces whatever the UI currently shows
    BrowserState { base64_image: String },
}

impl UiEvent {
    pub fn connect() -> Self {
        UiEvent::Connect {
            status: "success".to_string(),
        }
    }

    pub fn action(action: impl Into<String>, details: impl Into<String>) -> Self {
        UiEvent::AgentAction {
            action: action.into(),
            details: details.into(),
        }
    }
}

/// The single client-to-server message kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub content: String,
}
