use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use generation_provider::{ConversationId, Role};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::MessageStoreError;
use crate::schema::{
    ConversationSummary, ConversationWithMessages, SavedMessage, StoredMessage, StoredMessageId,
};
use crate::store::MessageStore;

const MAX_TITLE_CHARS: usize = 80;
const UNTITLED: &str = "Untitled";

#[derive(Debug)]
struct ConversationRow {
    id: ConversationId,
    title: String,
    created_at: String,
    deleted: bool,
}

#[derive(Debug)]
struct MessageRow {
    message: StoredMessage,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Tables {
    conversations: Vec<ConversationRow>,
    messages: Vec<MessageRow>,
    next_conversation_id: ConversationId,
    next_message_id: StoredMessageId,
}

impl Tables {
    fn live_conversation(&self, id: ConversationId) -> Option<&ConversationRow> {
        self.conversations
            .iter()
            .find(|row| row.id == id && !row.deleted)
    }

    fn live_conversation_mut(&mut self, id: ConversationId) -> Option<&mut ConversationRow> {
        self.conversations
            .iter_mut()
            .find(|row| row.id == id && !row.deleted)
    }

    fn live_messages(&self, conversation_id: ConversationId) -> Vec<StoredMessage> {
        self.messages
            .iter()
            .filter(|row| !row.deleted && row.message.conversation_id == conversation_id)
            .map(|row| row.message.clone())
            .collect()
    }

    fn summaries(&self) -> Vec<ConversationSummary> {
        // Ids grow monotonically, so reverse insertion order is newest first.
        self.conversations
            .iter()
            .rev()
            .filter(|row| !row.deleted)
            .map(|row| ConversationSummary {
                id: row.id,
                title: row.title.clone(),
                created_at: row.created_at.clone(),
            })
            .collect()
    }
}

/// Process-local [`MessageStore`] with soft-delete semantics.
///
/// Deleted rows stay in the tables flagged as deleted and are filtered from
/// every read.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    tables: Mutex<Tables>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(
        &self,
        conversation_id: Option<ConversationId>,
        text: &str,
        role: Role,
    ) -> Result<SavedMessage, MessageStoreError> {
        if text.trim().is_empty() {
            return Err(MessageStoreError::EmptyMessage);
        }

        let mut tables = self.tables();
        let conversation_id = match conversation_id {
            Some(id) => {
                if tables.live_conversation(id).is_none() {
                    return Err(MessageStoreError::ConversationNotFound {
                        conversation_id: id,
                    });
                }
                id
            }
            None => {
                let created_at = now_rfc3339()?;
                tables.next_conversation_id += 1;
                let id = tables.next_conversation_id;
                tables.conversations.push(ConversationRow {
                    id,
                    title: title_from_message(text),
                    created_at,
                    deleted: false,
                });
                id
            }
        };

        tables.next_message_id += 1;
        let message_id = tables.next_message_id;
        tables.messages.push(MessageRow {
            message: StoredMessage {
                id: message_id,
                conversation_id,
                role,
                content: text.to_string(),
            },
            deleted: false,
        });

        Ok(SavedMessage {
            conversation_id,
            message_id,
        })
    }

    async fn delete_message(&self, message_id: StoredMessageId) -> Result<(), MessageStoreError> {
        let mut tables = self.tables();
        if let Some(row) = tables
            .messages
            .iter_mut()
            .find(|row| row.message.id == message_id)
        {
            row.deleted = true;
        }
        Ok(())
    }

    async fn read_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, MessageStoreError> {
        let tables = self.tables();
        if tables.live_conversation(conversation_id).is_none() {
            return Err(MessageStoreError::ConversationNotFound { conversation_id });
        }
        Ok(tables.live_messages(conversation_id))
    }

    async fn read_conversations(&self) -> Result<Vec<ConversationSummary>, MessageStoreError> {
        Ok(self.tables().summaries())
    }

    async fn read_conversations_with_messages(
        &self,
    ) -> Result<Vec<ConversationWithMessages>, MessageStoreError> {
        let tables = self.tables();
        Ok(tables
            .summaries()
            .into_iter()
            .map(|summary| {
                let messages = tables.live_messages(summary.id);
                ConversationWithMessages { summary, messages }
            })
            .collect())
    }

    async fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<(), MessageStoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MessageStoreError::EmptyTitle);
        }

        let mut tables = self.tables();
        let row = tables
            .live_conversation_mut(conversation_id)
            .ok_or(MessageStoreError::ConversationNotFound { conversation_id })?;
        row.title = title.to_string();
        Ok(())
    }

    async fn delete_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), MessageStoreError> {
        let mut tables = self.tables();
        let row = tables
            .live_conversation_mut(conversation_id)
            .ok_or(MessageStoreError::ConversationNotFound { conversation_id })?;
        row.deleted = true;
        for message in tables
            .messages
            .iter_mut()
            .filter(|row| row.message.conversation_id == conversation_id)
        {
            message.deleted = true;
        }
        Ok(())
    }

    async fn delete_all_conversations(&self) -> Result<(), MessageStoreError> {
        let mut tables = self.tables();
        for row in &mut tables.conversations {
            row.deleted = true;
        }
        for row in &mut tables.messages {
            row.deleted = true;
        }
        Ok(())
    }
}

fn now_rfc3339() -> Result<String, MessageStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(MessageStoreError::ClockFormat)
}

/// First non-blank line of the opening message, capped at
/// [`MAX_TITLE_CHARS`] characters.
fn title_from_message(text: &str) -> String {
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(UNTITLED);
    first_line.chars().take(MAX_TITLE_CHARS).collect()
}
