use async_trait::async_trait;
use generation_provider::{ConversationId, Role};

use crate::error::MessageStoreError;
use crate::schema::{
    ConversationSummary, ConversationWithMessages, SavedMessage, StoredMessage, StoredMessageId,
};

/// Persistence collaborator for conversations and their messages.
///
/// Implementations own ordering: messages come back in insertion order and
/// conversations newest first.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persists `text`. With `conversation_id == None` a new conversation is
    /// created and its id returned in [`SavedMessage`].
    async fn save(
        &self,
        conversation_id: Option<ConversationId>,
        text: &str,
        role: Role,
    ) -> Result<SavedMessage, MessageStoreError>;

    /// Removes a message. Deleting an unknown or already deleted message
    /// succeeds.
    async fn delete_message(&self, message_id: StoredMessageId) -> Result<(), MessageStoreError>;

    async fn read_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, MessageStoreError>;

    async fn read_conversations(&self) -> Result<Vec<ConversationSummary>, MessageStoreError>;

    async fn read_conversations_with_messages(
        &self,
    ) -> Result<Vec<ConversationWithMessages>, MessageStoreError>;

    async fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<(), MessageStoreError>;

    async fn delete_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), MessageStoreError>;

    async fn delete_all_conversations(&self) -> Result<(), MessageStoreError>;
}
