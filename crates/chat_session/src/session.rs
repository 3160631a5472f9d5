use generation_provider::{
    ChatMode, ContentPart, ConversationId, GenerationError, GenerationRequest, StreamId,
};
use message_store::{
    ConversationSummary, ConversationWithMessages, MessageStoreError, SavedMessage, StoredMessage,
    StoredMessageId,
};

use crate::cache::MessageCache;
use crate::identity::{IdentityTracker, SessionIdentity};
use crate::message::{local_message_key, Message};
use crate::pending::{PendingStream, PendingStreamTracker};

pub const CHAT_MODE_ENV_VAR: &str = "COWRITE_CHAT_MODE";
pub const RETRY_DESCRIPTION: &str = "Please try again";

const PERSIST_FAILED_MESSAGE: &str = "Failed to send message";
const LOAD_FAILED_MESSAGE: &str = "Failed to load conversation";

/// Reads the default chat mode, falling back to [`ChatMode::default`] for a
/// missing or unknown value.
pub fn chat_mode_from_env() -> ChatMode {
    sanitize_chat_mode(std::env::var(CHAT_MODE_ENV_VAR).ok())
}

fn sanitize_chat_mode(raw: Option<String>) -> ChatMode {
    let Some(value) = raw else {
        return ChatMode::default();
    };

    if value.trim().is_empty() {
        return ChatMode::default();
    }

    match value.parse() {
        Ok(mode) => mode,
        Err(error) => {
            tracing::warn!(%error, "using default chat mode");
            ChatMode::default()
        }
    }
}

/// One-shot user-facing failure notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub description: String,
}

impl Notification {
    fn retry(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            description: RETRY_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Committed,
    RolledBack,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    AwaitingPersist,
    Streaming { stream_id: StreamId },
    Settled(Settled),
}

impl Status {
    /// True when a new submission may start.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Idle | Self::Settled(_))
    }
}

/// Accepted submission waiting for its user message to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    prompt: String,
    input: String,
    conversation_id: Option<ConversationId>,
    snapshot: Vec<Message>,
    submission: u64,
    switch_epoch: u64,
}

impl SubmitTicket {
    /// Trimmed text to persist and send.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Conversation the message should be saved into; `None` creates one.
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedOutcome {
    /// The user left the conversation while persisting; the saved message
    /// must be deleted and no stream started.
    Abandoned { message_id: StoredMessageId },
    Stream {
        request: GenerationRequest,
        created_conversation: bool,
    },
}

/// Cleanup owed by the host after the session dropped a pending stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackPlan {
    pub stream_id: StreamId,
    pub message_id: StoredMessageId,
}

impl RollbackPlan {
    fn from_record(record: &PendingStream) -> Self {
        Self {
            stream_id: record.stream_id,
            message_id: record.user_message_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPlan {
    Unchanged,
    Cleared,
    Cached,
    Fetch(ConversationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPlan {
    pub rollback: Option<RollbackPlan>,
    pub load: LoadPlan,
}

/// Conversation state owned by one chat view.
///
/// Every method is a synchronous transition; the async driver in
/// [`crate::controller`] calls them under a short lock.
#[derive(Debug, Clone)]
pub struct ChatSession {
    status: Status,
    input: String,
    mode: ChatMode,
    messages: Vec<Message>,
    current: Option<ConversationId>,
    identity: IdentityTracker,
    pending: PendingStreamTracker,
    cache: MessageCache,
    conversations: Vec<ConversationSummary>,
    notification: Option<Notification>,
    /// Submission currently waiting on its persist result.
    awaiting: Option<u64>,
    next_submission: u64,
    /// Conversation whose messages are being fetched.
    loading: Option<ConversationId>,
    switch_epoch: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_mode(ChatMode::default())
    }

    pub fn with_mode(mode: ChatMode) -> Self {
        Self {
            status: Status::Idle,
            input: String::new(),
            mode,
            messages: Vec::new(),
            current: None,
            identity: IdentityTracker::new(None),
            pending: PendingStreamTracker::default(),
            cache: MessageCache::default(),
            conversations: Vec::new(),
            notification: None,
            awaiting: None,
            next_submission: 0,
            loading: None,
            switch_epoch: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// True when a submission would be accepted: nothing in flight and no
    /// fetch outstanding for the current conversation.
    pub fn is_ready(&self) -> bool {
        self.status.is_ready() && self.loading.is_none()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn chat_mode(&self) -> ChatMode {
        self.mode
    }

    pub fn set_chat_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_conversation(&self) -> Option<ConversationId> {
        self.current
    }

    pub fn identity(&self) -> &SessionIdentity {
        self.identity.identity()
    }

    pub fn pending(&self) -> &PendingStreamTracker {
        &self.pending
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn set_conversations(&mut self, conversations: Vec<ConversationSummary>) {
        self.conversations = conversations;
    }

    /// Seeds the cache and list from a bulk read, replacing both.
    pub fn initialize_cache(&mut self, conversations: Vec<ConversationWithMessages>) {
        let mut summaries = Vec::with_capacity(conversations.len());
        let mut entries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let messages: Vec<Message> =
                conversation.messages.iter().map(Message::from_stored).collect();
            entries.push((conversation.summary.id, messages));
            summaries.push(conversation.summary);
        }
        self.cache.initialize(entries);
        self.conversations = summaries;
    }

    /// Drops cached messages and the list entry for a deleted conversation.
    /// Returns `true` when it was the current conversation.
    pub fn forget_conversation(&mut self, conversation_id: ConversationId) -> bool {
        self.cache.remove(conversation_id);
        self.conversations
            .retain(|conversation| conversation.id != conversation_id);
        self.current == Some(conversation_id)
    }

    pub fn forget_all_conversations(&mut self) {
        self.cache.clear();
        self.conversations.clear();
    }

    /// Accepts a submission when ready and `text` is not blank.
    ///
    /// The message list is snapshotted and the input cleared; nothing is
    /// appended until the user message is persisted. Rejected while the
    /// current conversation is still loading, since the snapshot would miss
    /// its history.
    pub fn begin_submit(&mut self, text: impl Into<String>) -> Option<SubmitTicket> {
        let input: String = text.into();
        let prompt = input.trim();
        if !self.is_ready() || prompt.is_empty() {
            return None;
        }

        let submission = self.next_submission;
        self.next_submission = self.next_submission.wrapping_add(1);
        let ticket = SubmitTicket {
            prompt: prompt.to_string(),
            input: input.clone(),
            conversation_id: self.current,
            snapshot: self.messages.clone(),
            submission,
            switch_epoch: self.switch_epoch,
        };
        self.input.clear();
        self.notification = None;
        self.awaiting = Some(submission);
        self.status = Status::AwaitingPersist;
        tracing::debug!(
            submission,
            conversation_id = ?ticket.conversation_id,
            "submission accepted"
        );
        Some(ticket)
    }

    /// True while `ticket` is the submission the session is waiting on.
    fn owns_persist(&self, ticket: &SubmitTicket) -> bool {
        self.status == Status::AwaitingPersist && self.awaiting == Some(ticket.submission)
    }

    /// Restores the input of a submission whose save failed. A superseded
    /// ticket leaves the session untouched.
    pub fn on_persist_failed(&mut self, ticket: SubmitTicket, error: &MessageStoreError) {
        if !self.owns_persist(&ticket) {
            tracing::debug!(
                submission = ticket.submission,
                %error,
                "ignoring stale persist failure"
            );
            return;
        }

        tracing::debug!(%error, "restoring input after persist failure");
        self.awaiting = None;
        self.input = ticket.input;
        self.notification = Some(Notification::retry(PERSIST_FAILED_MESSAGE));
        self.status = Status::Idle;
    }

    pub fn on_persisted(
        &mut self,
        ticket: SubmitTicket,
        saved: SavedMessage,
        stream_id: StreamId,
    ) -> PersistedOutcome {
        if !self.owns_persist(&ticket) {
            tracing::debug!(
                submission = ticket.submission,
                message_id = saved.message_id,
                "submission superseded while persisting"
            );
            return PersistedOutcome::Abandoned {
                message_id: saved.message_id,
            };
        }

        self.awaiting = None;
        if ticket.switch_epoch != self.switch_epoch {
            tracing::debug!(
                message_id = saved.message_id,
                "conversation changed while persisting; abandoning submission"
            );
            self.status = Status::Settled(Settled::Cancelled);
            return PersistedOutcome::Abandoned {
                message_id: saved.message_id,
            };
        }

        let created_conversation = self.current.is_none();
        self.current = Some(saved.conversation_id);
        self.identity.observe(self.current);

        let history = ticket.snapshot.iter().map(Message::to_history).collect();
        self.messages.push(Message::user(saved.message_id, ticket.prompt.clone()));
        self.pending.begin(PendingStream {
            stream_id,
            conversation_id: saved.conversation_id,
            user_message_id: saved.message_id,
            snapshot: ticket.snapshot,
            input: ticket.input,
        });
        self.status = Status::Streaming { stream_id };
        tracing::debug!(
            stream_id,
            conversation_id = saved.conversation_id,
            created_conversation,
            "stream started"
        );

        PersistedOutcome::Stream {
            request: GenerationRequest {
                stream_id,
                conversation_id: Some(saved.conversation_id),
                mode: self.mode,
                prompt: ticket.prompt,
                history,
            },
            created_conversation,
        }
    }

    fn is_streaming(&self, stream_id: StreamId) -> bool {
        matches!(self.status, Status::Streaming { stream_id: active } if active == stream_id)
    }

    fn assistant_message_mut(&mut self, stream_id: StreamId) -> &mut Message {
        let key = local_message_key(stream_id);
        let position = self.messages.iter().rposition(|message| message.id == key);
        match position {
            Some(index) => &mut self.messages[index],
            None => {
                self.messages.push(Message::assistant_placeholder(stream_id));
                let last = self.messages.len() - 1;
                &mut self.messages[last]
            }
        }
    }

    pub fn on_stream_started(&mut self, stream_id: StreamId) {
        if !self.is_streaming(stream_id) {
            return;
        }
        self.assistant_message_mut(stream_id);
    }

    pub fn on_stream_part(&mut self, stream_id: StreamId, part: ContentPart) {
        if !self.is_streaming(stream_id) {
            return;
        }
        self.assistant_message_mut(stream_id).push_part(part);
    }

    /// Commits the stream. Returns `false` for a stale stream id.
    pub fn on_stream_finished(&mut self, stream_id: StreamId) -> bool {
        if !self.is_streaming(stream_id) {
            return false;
        }

        if let Some(record) = self.pending.commit(stream_id) {
            self.cache.insert(record.conversation_id, self.messages.clone());
        }
        self.status = Status::Settled(Settled::Committed);
        tracing::debug!(stream_id, "stream committed");
        true
    }

    /// Rolls back a failed stream, restoring the snapshot and input.
    pub fn on_stream_failed(
        &mut self,
        stream_id: StreamId,
        error: &GenerationError,
    ) -> Option<RollbackPlan> {
        if !self.is_streaming(stream_id) {
            return None;
        }

        let plan = self.roll_back_with_restore(Settled::RolledBack)?;
        self.notification = Some(Notification::retry(error.user_message()));
        tracing::debug!(stream_id, %error, "stream rolled back");
        Some(plan)
    }

    /// Handles a provider-side cancellation of the active stream. The turn
    /// is undone like a failure but without a notification.
    pub fn on_stream_cancelled(&mut self, stream_id: StreamId) -> Option<RollbackPlan> {
        if !self.is_streaming(stream_id) {
            return None;
        }

        let plan = self.roll_back_with_restore(Settled::Cancelled)?;
        tracing::debug!(stream_id, "stream cancelled by provider");
        Some(plan)
    }

    fn roll_back_with_restore(&mut self, settled: Settled) -> Option<RollbackPlan> {
        let record = self.pending.take();
        self.status = Status::Settled(settled);
        let record = record?;
        let plan = RollbackPlan::from_record(&record);
        self.messages = record.snapshot;
        self.input = record.input;
        Some(plan)
    }

    /// Applies a conversation change observed from navigation.
    ///
    /// A stream whose target no longer matches is dropped without restoring
    /// its snapshot; the message list is replaced by the new conversation.
    pub fn observe_conversation(&mut self, conversation_id: Option<ConversationId>) -> SwitchPlan {
        if conversation_id.is_some() && conversation_id == self.current {
            return SwitchPlan {
                rollback: None,
                load: LoadPlan::Unchanged,
            };
        }

        self.identity.observe(conversation_id);
        self.switch_epoch = self.switch_epoch.wrapping_add(1);

        let rollback = if !self.status.is_ready() && self.pending.diverges_from(conversation_id) {
            let record = self.pending.take();
            self.status = Status::Settled(Settled::Cancelled);
            record.as_ref().map(RollbackPlan::from_record)
        } else {
            None
        };
        if let Some(plan) = rollback {
            tracing::debug!(
                stream_id = plan.stream_id,
                to = ?conversation_id,
                "conversation switched during stream"
            );
        }

        self.current = conversation_id;
        let load = match conversation_id {
            None => {
                self.messages.clear();
                LoadPlan::Cleared
            }
            Some(id) => match self.cache.get(id) {
                Some(cached) => {
                    self.messages = cached.to_vec();
                    LoadPlan::Cached
                }
                None => {
                    self.messages.clear();
                    LoadPlan::Fetch(id)
                }
            },
        };
        self.loading = match load {
            LoadPlan::Fetch(id) => Some(id),
            _ => None,
        };

        SwitchPlan { rollback, load }
    }

    /// Applies fetched messages. Ignored when the user moved on or a stream
    /// is already writing into the list.
    pub fn on_messages_loaded(
        &mut self,
        conversation_id: ConversationId,
        stored: Vec<StoredMessage>,
    ) -> bool {
        if self.current != Some(conversation_id) {
            return false;
        }
        self.loading = None;
        if self.pending.is_pending() {
            return false;
        }

        self.messages = stored.iter().map(Message::from_stored).collect();
        self.cache.insert(conversation_id, self.messages.clone());
        true
    }

    /// Clears the view after a failed fetch, e.g. for a deleted conversation.
    pub fn on_load_failed(&mut self, conversation_id: ConversationId) -> bool {
        if self.current != Some(conversation_id) {
            return false;
        }

        self.loading = None;
        self.messages.clear();
        self.current = None;
        self.identity.observe(None);
        self.notification = Some(Notification::retry(LOAD_FAILED_MESSAGE));
        true
    }

    /// Drops anything in flight and starts a fresh identity for the current
    /// conversation. Messages return to the pre-submit snapshot.
    pub fn reset(&mut self) -> Option<RollbackPlan> {
        let plan = self.pending.take().map(|record| {
            let plan = RollbackPlan::from_record(&record);
            self.messages = record.snapshot;
            plan
        });
        self.switch_epoch = self.switch_epoch.wrapping_add(1);
        self.awaiting = None;
        self.status = Status::Idle;
        self.identity.reset();
        self.notification = None;
        plan
    }
}
