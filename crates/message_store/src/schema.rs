use generation_provider::{ConversationId, Role};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of one persisted message.
pub type StoredMessageId = i64;

/// Result of persisting a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    /// Conversation the message landed in; freshly created when the caller
    /// saved without one.
    pub conversation_id: ConversationId,
    pub message_id: StoredMessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: StoredMessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub summary: ConversationSummary,
    pub messages: Vec<StoredMessage>,
}
