use generation_provider::ConversationId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageStoreError {
    #[error("conversation {conversation_id} does not exist or was deleted")]
    ConversationNotFound { conversation_id: ConversationId },

    #[error("message text must not be empty")]
    EmptyMessage,

    #[error("conversation title must not be empty")]
    EmptyTitle,

    #[error("message store unavailable while {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl MessageStoreError {
    #[must_use]
    pub fn unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            message: message.into(),
        }
    }
}
