use generation_provider::{ConversationId, StreamId};
use message_store::StoredMessageId;

use crate::message::Message;

/// Undo state of the single in-flight optimistic submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStream {
    pub stream_id: StreamId,
    pub conversation_id: ConversationId,
    /// Provisionally persisted user message, deleted on rollback.
    pub user_message_id: StoredMessageId,
    /// Message list as it was before the optimistic apply.
    pub snapshot: Vec<Message>,
    /// Raw input text restored on failure.
    pub input: String,
}

#[derive(Debug, Clone, Default)]
pub struct PendingStreamTracker {
    record: Option<PendingStream>,
}

impl PendingStreamTracker {
    /// Starts tracking `record`, returning any record it displaced.
    pub fn begin(&mut self, record: PendingStream) -> Option<PendingStream> {
        self.record.replace(record)
    }

    /// Drops the record for `stream_id` after a successful stream.
    pub fn commit(&mut self, stream_id: StreamId) -> Option<PendingStream> {
        if self.stream_id() == Some(stream_id) {
            self.record.take()
        } else {
            None
        }
    }

    /// Removes the record for rollback. Callers restore state from the
    /// returned value after the slot is already empty.
    pub fn take(&mut self) -> Option<PendingStream> {
        self.record.take()
    }

    /// True when a record exists whose target differs from `observed`.
    pub fn diverges_from(&self, observed: Option<ConversationId>) -> bool {
        self.record
            .as_ref()
            .is_some_and(|record| Some(record.conversation_id) != observed)
    }

    pub fn active_target(&self) -> Option<ConversationId> {
        self.record.as_ref().map(|record| record.conversation_id)
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        self.record.as_ref().map(|record| record.stream_id)
    }

    pub fn is_pending(&self) -> bool {
        self.record.is_some()
    }
}
