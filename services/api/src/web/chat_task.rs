//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single chat turn: storing the user's message, streaming the
//! assistant's reply into the conversation and reporting progress.

use crate::adapters::prompts::CHAT_SYSTEM_PROMPT;
use crate::web::{protocol::ServerMessage, state::AppState};
use futures::StreamExt;
use study_assistant_core::{
    domain::NewMessage,
    ports::{AiGateway, ChatCompletionService, PortError, PortResult},
};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Identifies the assistant message a turn writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTurn {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
}

/// Represents the outcome of the `chat_turn` task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The provider finished the reply.
    Completed(ChatTurn),
    /// The token was cancelled before the reply finished.
    Cancelled(ChatTurn),
}

/// Runs one chat turn.
///
/// The credential is checked before anything is stored. Afterwards the user
/// message and an empty assistant message are added, and every fragment
/// extends the assistant message. A provider failure is written into the
/// assistant message as `Error: <message>` and then returned. Progress is
/// reported through `events`; a closed receiver does not stop the turn.
pub async fn chat_turn(
    app_state: &AppState,
    conversation_id: Option<Uuid>,
    content: &str,
    events: &UnboundedSender<ServerMessage>,
    token: CancellationToken,
) -> PortResult<TurnOutcome> {
    let gateway = app_state.gateway().await?;
    let turn = start_turn(app_state, conversation_id, content).await?;
    info!(
        conversation_id = %turn.conversation_id,
        message_id = %turn.message_id,
        "Chat turn started"
    );
    let _ = events.send(ServerMessage::TurnStarted {
        conversation_id: turn.conversation_id,
        message_id: turn.message_id,
    });

    match stream_reply(app_state, gateway.as_ref(), content, turn, events, &token).await {
        Ok(cancelled) => {
            let _ = events.send(ServerMessage::TurnCompleted {
                conversation_id: turn.conversation_id,
                message_id: turn.message_id,
            });
            if cancelled {
                info!(message_id = %turn.message_id, "Chat turn cancelled");
                Ok(TurnOutcome::Cancelled(turn))
            } else {
                info!(message_id = %turn.message_id, "Chat turn completed");
                Ok(TurnOutcome::Completed(turn))
            }
        }
        Err(e) => {
            error!("Chat turn failed: {}", e);
            if let Err(write_err) = write_reply(app_state, turn, &format!("Error: {}", e)).await {
                error!("Failed to record chat error: {}", write_err);
            }
            Err(e)
        }
    }
}

/// Resolves the target conversation and stores the user and placeholder messages.
async fn start_turn(
    app_state: &AppState,
    requested: Option<Uuid>,
    content: &str,
) -> PortResult<ChatTurn> {
    let mut conversations = app_state.conversations.lock().await;

    let conversation_id = match requested {
        Some(id) if conversations.conversation(id).is_some() => id,
        Some(id) => return Err(PortError::NotFound(format!("Conversation {}", id))),
        None => match conversations.active_conversation_id() {
            Some(id) if conversations.conversation(id).is_some() => id,
            _ => conversations.create_conversation()?,
        },
    };

    conversations.add_message(conversation_id, NewMessage::user(content))?;
    let message_id = conversations.add_message(conversation_id, NewMessage::assistant(""))?;

    Ok(ChatTurn {
        conversation_id,
        message_id,
    })
}

/// Streams the reply into the assistant message. Returns `true` if cancelled.
async fn stream_reply(
    app_state: &AppState,
    gateway: &dyn AiGateway,
    content: &str,
    turn: ChatTurn,
    events: &UnboundedSender<ServerMessage>,
    token: &CancellationToken,
) -> PortResult<bool> {
    let mut fragments = gateway.chat_stream(content, Some(CHAT_SYSTEM_PROMPT)).await?;
    let mut buffer = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(true),
            next = fragments.next() => next,
        };
        let Some(fragment) = next else {
            return Ok(false);
        };

        buffer.push_str(&fragment?);
        write_reply(app_state, turn, &buffer).await?;
        let _ = events.send(ServerMessage::Delta {
            conversation_id: turn.conversation_id,
            message_id: turn.message_id,
            content: buffer.clone(),
        });
    }
}

/// Replaces the assistant message content. A deleted target is a no-op.
async fn write_reply(app_state: &AppState, turn: ChatTurn, content: &str) -> PortResult<()> {
    let result = app_state.conversations.lock().await.update_message(
        turn.conversation_id,
        turn.message_id,
        content,
    );
    match result {
        Err(e) if e.is_not_found() => {
            debug!(message_id = %turn.message_id, "Reply target was deleted, dropping write");
            Ok(())
        }
        other => other,
    }
}
