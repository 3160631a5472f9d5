//! Conversation and message persistence used by the chat session.
//!
//! [`MessageStore`] is the async collaborator contract; [`InMemoryMessageStore`]
//! is the process-local implementation used by the demo binary and tests.

mod error;
mod memory;
mod schema;
mod store;

pub use error::MessageStoreError;
pub use memory::InMemoryMessageStore;
pub use schema::{
    ConversationSummary, ConversationWithMessages, SavedMessage, StoredMessage, StoredMessageId,
};
pub use store::MessageStore;
