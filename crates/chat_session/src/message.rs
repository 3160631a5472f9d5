use generation_provider::{ContentPart, HistoryMessage, Role, StreamId};
use message_store::{StoredMessage, StoredMessageId};

/// Local message identifier: `m-<id>` for persisted messages,
/// `local-<stream>` for optimistic assistant output.
pub type MessageId = String;

#[must_use]
pub fn stored_message_key(id: StoredMessageId) -> MessageId {
    format!("m-{id}")
}

#[must_use]
pub fn local_message_key(stream_id: StreamId) -> MessageId {
    format!("local-{stream_id}")
}

/// One entry of the visible message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    /// Concatenation of the text parts.
    pub content: String,
    pub parts: Vec<ContentPart>,
}

impl Message {
    pub fn from_stored(stored: &StoredMessage) -> Self {
        Self {
            id: stored_message_key(stored.id),
            role: stored.role,
            content: stored.content.clone(),
            parts: vec![ContentPart::text(stored.content.clone())],
        }
    }

    pub fn user(id: StoredMessageId, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: stored_message_key(id),
            role: Role::User,
            content: text.clone(),
            parts: vec![ContentPart::text(text)],
        }
    }

    pub fn assistant_placeholder(stream_id: StreamId) -> Self {
        Self {
            id: local_message_key(stream_id),
            role: Role::Assistant,
            content: String::new(),
            parts: Vec::new(),
        }
    }

    /// Appends a streamed part, merging it into the previous part when both
    /// are text or both are reasoning.
    pub fn push_part(&mut self, part: ContentPart) {
        if let ContentPart::Text { text } = &part {
            self.content.push_str(text);
        }

        let merged = match (self.parts.last_mut(), &part) {
            (Some(ContentPart::Text { text: last }), ContentPart::Text { text })
            | (Some(ContentPart::Reasoning { text: last }), ContentPart::Reasoning { text }) => {
                last.push_str(text);
                true
            }
            _ => false,
        };
        if !merged {
            self.parts.push(part);
        }
    }

    pub fn to_history(&self) -> HistoryMessage {
        HistoryMessage {
            role: self.role,
            text: self.content.clone(),
        }
    }
}
