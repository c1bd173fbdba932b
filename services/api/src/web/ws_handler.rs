//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a chat WebSocket connection.
//! Each `send_message` spawns a chat turn; `cancel` stops the turns in flight.

use crate::web::{
    chat_task::chat_turn,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established");

    let (mut ws_sender, mut receiver) = socket.split();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // --- 1. Outbound Forwarder ---
    // Turns report through the channel; this task is the only writer to the socket.
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                warn!("Failed to send server message. Client may have disconnected.");
                break;
            }
        }
    });

    // --- 2. Main Message Loop ---
    let mut cancellation_token = CancellationToken::new();
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                handle_text_message(text.as_str(), &app_state, &events_tx, &mut cancellation_token);
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    // Turns already running finish writing into their conversations.
    drop(events_tx);
    if let Err(e) = forwarder.await {
        error!("WebSocket forwarder task failed: {}", e);
    }
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    events_tx: &mpsc::UnboundedSender<ServerMessage>,
    cancellation_token: &mut CancellationToken,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SendMessage {
            conversation_id,
            content,
        }) => {
            if content.trim().is_empty() {
                warn!("Ignoring empty chat message.");
                return;
            }
            let app_state = app_state.clone();
            let events_tx = events_tx.clone();
            let token = cancellation_token.child_token();
            tokio::spawn(async move {
                if let Err(e) =
                    chat_turn(&app_state, conversation_id, &content, &events_tx, token).await
                {
                    let _ = events_tx.send(ServerMessage::Error {
                        message: e.to_string(),
                    });
                }
            });
        }
        Ok(ClientMessage::Cancel) => {
            info!("Cancel message received. Stopping chat turns in flight.");
            cancellation_token.cancel();
            *cancellation_token = CancellationToken::new();
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let _ = events_tx.send(ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            });
        }
    }
}
