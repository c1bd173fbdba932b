//! crates/study_assistant_core/src/stores/conversations.rs
//!
//! Chat threads and their messages. Conversations are kept most-recent-first;
//! messages inside a conversation are strictly append-ordered.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{Persistor, CHAT_RECORD};
use crate::domain::{
    derive_title, now, Conversation, Message, NewMessage, Role, DEFAULT_CONVERSATION_TITLE,
};
use crate::ports::{PortError, PortResult, SnapshotStorage};

/// Persisted state of the conversation store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    pub conversations: Vec<Conversation>,
    pub active_conversation_id: Option<Uuid>,
}

pub struct ConversationStore {
    state: ChatState,
    persistor: Persistor,
}

impl ConversationStore {
    /// Opens the store, loading the last saved snapshot if there is one.
    pub fn open(storage: Arc<dyn SnapshotStorage>) -> PortResult<Self> {
        let persistor = Persistor::new(storage, CHAT_RECORD);
        let state = persistor.load()?;
        Ok(Self { state, persistor })
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.state.conversations
    }

    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.state.conversations.iter().find(|c| c.id == id)
    }

    pub fn active_conversation_id(&self) -> Option<Uuid> {
        self.state.active_conversation_id
    }

    pub fn get_active_conversation(&self) -> Option<&Conversation> {
        self.state
            .active_conversation_id
            .and_then(|id| self.conversation(id))
    }

    /// Creates an empty conversation, makes it active and returns its id.
    pub fn create_conversation(&mut self) -> PortResult<Uuid> {
        let timestamp = now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        };
        let id = self.persistor.commit(&mut self.state, |state| {
            let id = conversation.id;
            state.conversations.insert(0, conversation);
            state.active_conversation_id = Some(id);
            Ok(id)
        })?;
        debug!(conversation_id = %id, "Conversation created");
        Ok(id)
    }

    /// Appends a message and returns its id. The first user message fixes the title.
    pub fn add_message(&mut self, conversation_id: Uuid, message: NewMessage) -> PortResult<Uuid> {
        self.persistor.commit(&mut self.state, |state| {
            let conversation = conversation_mut(state, conversation_id)?;
            let timestamp = now();
            let id = Uuid::new_v4();

            let first_user_message = message.role == Role::User
                && !conversation.messages.iter().any(|m| m.role == Role::User);
            if first_user_message {
                conversation.title = derive_title(&message.content);
            }
            conversation.messages.push(Message {
                id,
                role: message.role,
                content: message.content,
                timestamp,
            });
            conversation.updated_at = timestamp;
            Ok(id)
        })
    }

    /// Replaces the content of an existing message. Streaming calls this once per fragment.
    pub fn update_message(
        &mut self,
        conversation_id: Uuid,
        message_id: Uuid,
        content: impl Into<String>,
    ) -> PortResult<()> {
        let content = content.into();
        self.persistor.commit(&mut self.state, |state| {
            let message = conversation_mut(state, conversation_id)?
                .messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or_else(|| {
                    PortError::NotFound(format!(
                        "Message {} in conversation {}",
                        message_id, conversation_id
                    ))
                })?;
            message.content = content;
            Ok(())
        })
    }

    pub fn set_active_conversation(&mut self, id: Option<Uuid>) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            state.active_conversation_id = id;
            Ok(())
        })
    }

    pub fn delete_conversation(&mut self, id: Uuid) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let before = state.conversations.len();
            state.conversations.retain(|c| c.id != id);
            if state.conversations.len() == before {
                return Err(PortError::NotFound(format!("Conversation {}", id)));
            }
            if state.active_conversation_id == Some(id) {
                state.active_conversation_id = None;
            }
            Ok(())
        })?;
        debug!(conversation_id = %id, "Conversation deleted");
        Ok(())
    }

    pub fn clear_conversations(&mut self) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            *state = ChatState::default();
            Ok(())
        })
    }
}

fn conversation_mut(state: &mut ChatState, id: Uuid) -> PortResult<&mut Conversation> {
    state
        .conversations
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| PortError::NotFound(format!("Conversation {}", id)))
}
