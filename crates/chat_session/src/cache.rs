use std::collections::HashMap;

use generation_provider::ConversationId;

use crate::message::Message;

/// Loaded message lists keyed by conversation id.
#[derive(Debug, Clone, Default)]
pub struct MessageCache {
    entries: HashMap<ConversationId, Vec<Message>>,
}

impl MessageCache {
    pub fn get(&self, conversation_id: ConversationId) -> Option<&[Message]> {
        self.entries.get(&conversation_id).map(Vec::as_slice)
    }

    pub fn insert(&mut self, conversation_id: ConversationId, messages: Vec<Message>) {
        self.entries.insert(conversation_id, messages);
    }

    pub fn remove(&mut self, conversation_id: ConversationId) -> Option<Vec<Message>> {
        self.entries.remove(&conversation_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces every entry, as done by a bulk preload.
    pub fn initialize(&mut self, entries: impl IntoIterator<Item = (ConversationId, Vec<Message>)>) {
        self.entries = entries.into_iter().collect();
    }

    pub fn contains(&self, conversation_id: ConversationId) -> bool {
        self.entries.contains_key(&conversation_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
