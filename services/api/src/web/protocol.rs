//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the desktop client and the API server
//! for streaming chat turns.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts a chat turn. Without a conversation id the active conversation is
    /// used, and a new one is created if there is none.
    SendMessage {
        #[serde(default)]
        conversation_id: Option<Uuid>,
        content: String,
    },

    /// Stops every turn still streaming on this connection. Text already
    /// received stays in the assistant message.
    Cancel,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The user message and an empty assistant message have been stored.
    TurnStarted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// The assistant message now holds `content`, the full text received so far.
    Delta {
        conversation_id: Uuid,
        message_id: Uuid,
        content: String,
    },

    /// The stream ended, either normally or through cancellation.
    TurnCompleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}
