use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use generation_provider::{
    new_cancel_signal, CancelSignal, ChatMode, ConversationId, GenerationError,
    GenerationProvider, Role, StreamEvent, StreamId,
};
use message_store::{MessageStore, MessageStoreError, StoredMessageId};

use crate::session::{ChatSession, LoadPlan, PersistedOutcome, RollbackPlan};

const MISSING_TERMINAL_EVENT: &str = "Provider exited without a terminal event";

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not ready, or blank text.
    Rejected,
    PersistFailed,
    /// The conversation changed before the user message was persisted.
    Abandoned,
    Committed,
    RolledBack,
    /// Dropped by a conversation change or provider cancellation.
    Cancelled,
}

/// How the message list was populated after a conversation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Unchanged,
    Cleared,
    Cached,
    Fetched,
    /// A later change superseded this load.
    Stale,
    Failed,
}

enum Settlement {
    Committed,
    Cancelled(Option<RollbackPlan>),
}

struct ActiveStream {
    stream_id: StreamId,
    cancel: CancelSignal,
}

/// Async driver for one [`ChatSession`].
///
/// The session lock is only taken for synchronous transitions and is never
/// held across an await, so a submit and a conversation switch can
/// interleave on one task.
pub struct SessionController {
    session: Arc<Mutex<ChatSession>>,
    store: Arc<dyn MessageStore>,
    provider: Arc<dyn GenerationProvider>,
    next_stream_id: AtomicU64,
    active_stream: Mutex<Option<ActiveStream>>,
}

impl SessionController {
    pub fn new(
        session: Arc<Mutex<ChatSession>>,
        store: Arc<dyn MessageStore>,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            session,
            store,
            provider,
            next_stream_id: AtomicU64::new(1),
            active_stream: Mutex::new(None),
        }
    }

    pub fn session(&self) -> Arc<Mutex<ChatSession>> {
        Arc::clone(&self.session)
    }

    /// Runs `f` against the session under its lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        f(&mut lock_unpoisoned(&self.session))
    }

    pub fn set_chat_mode(&self, mode: ChatMode) {
        self.with_session(|session| session.set_chat_mode(mode));
    }

    pub fn active_stream_id(&self) -> Option<StreamId> {
        self.lock_active_stream()
            .as_ref()
            .map(|active| active.stream_id)
    }

    pub async fn submit(&self, text: impl Into<String>) -> SubmitOutcome {
        let Some(ticket) = self.with_session(|session| session.begin_submit(text)) else {
            return SubmitOutcome::Rejected;
        };

        let saved = match self
            .store
            .save(ticket.conversation_id(), ticket.prompt(), Role::User)
            .await
        {
            Ok(saved) => saved,
            Err(error) => {
                tracing::warn!(%error, "failed to persist user message");
                self.with_session(|session| session.on_persist_failed(ticket, &error));
                return SubmitOutcome::PersistFailed;
            }
        };

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let persisted = self.with_session(|session| session.on_persisted(ticket, saved, stream_id));
        let (request, created_conversation) = match persisted {
            PersistedOutcome::Abandoned { message_id } => {
                self.delete_provisional(message_id).await;
                return SubmitOutcome::Abandoned;
            }
            PersistedOutcome::Stream {
                request,
                created_conversation,
            } => (request, created_conversation),
        };

        let cancel = new_cancel_signal();
        *self.lock_active_stream() = Some(ActiveStream {
            stream_id,
            cancel: Arc::clone(&cancel),
        });

        if created_conversation {
            if let Err(error) = self.refresh_conversations().await {
                tracing::warn!(%error, "failed to refresh conversation list");
            }
        }

        let mut settlement = None;
        let result = {
            let session = &self.session;
            let mut emit = |event: StreamEvent| {
                let applied = apply_stream_event(&mut lock_unpoisoned(session), event);
                if let Some(applied) = applied {
                    settlement.get_or_insert(applied);
                }
            };
            self.provider.generate(request, cancel, &mut emit).await
        };

        match (settlement, result) {
            (Some(Settlement::Committed), _) => {
                self.clear_active_stream_if_matching(stream_id);
                SubmitOutcome::Committed
            }
            (Some(Settlement::Cancelled(plan)), _) => {
                self.clear_active_stream_if_matching(stream_id);
                if let Some(plan) = plan {
                    self.delete_provisional(plan.message_id).await;
                }
                SubmitOutcome::Cancelled
            }
            (None, Err(error)) => self.roll_back_failed_stream(stream_id, &error).await,
            (None, Ok(())) => {
                let error = GenerationError::Failed(MISSING_TERMINAL_EVENT.to_string());
                self.roll_back_failed_stream(stream_id, &error).await
            }
        }
    }

    /// Drops the pending record, cancels the stream, then deletes the
    /// provisional user message. The registry entry lives until the cancel
    /// has been signalled.
    async fn roll_back_failed_stream(
        &self,
        stream_id: StreamId,
        error: &GenerationError,
    ) -> SubmitOutcome {
        tracing::warn!(stream_id, %error, "generation failed");
        let plan = self.with_session(|session| session.on_stream_failed(stream_id, error));
        let Some(plan) = plan else {
            // A conversation change already dropped this stream.
            self.clear_active_stream_if_matching(stream_id);
            return SubmitOutcome::Cancelled;
        };

        self.cancel_stream(plan.stream_id);
        self.clear_active_stream_if_matching(plan.stream_id);
        self.delete_provisional(plan.message_id).await;
        SubmitOutcome::RolledBack
    }

    /// Moves the session to `conversation_id`, dropping a diverged stream
    /// and loading messages from the cache or the store.
    pub async fn switch_conversation(
        &self,
        conversation_id: Option<ConversationId>,
    ) -> LoadOutcome {
        let plan = self.with_session(|session| session.observe_conversation(conversation_id));
        if let Some(rollback) = plan.rollback {
            self.cancel_stream(rollback.stream_id);
            self.delete_provisional(rollback.message_id).await;
        }

        match plan.load {
            LoadPlan::Unchanged => LoadOutcome::Unchanged,
            LoadPlan::Cleared => LoadOutcome::Cleared,
            LoadPlan::Cached => LoadOutcome::Cached,
            LoadPlan::Fetch(id) => self.fetch_messages(id).await,
        }
    }

    async fn fetch_messages(&self, conversation_id: ConversationId) -> LoadOutcome {
        match self.store.read_messages(conversation_id).await {
            Ok(messages) => {
                let applied = self
                    .with_session(|session| session.on_messages_loaded(conversation_id, messages));
                if applied {
                    LoadOutcome::Fetched
                } else {
                    LoadOutcome::Stale
                }
            }
            Err(error) => {
                tracing::warn!(conversation_id, %error, "failed to load messages");
                if self.with_session(|session| session.on_load_failed(conversation_id)) {
                    LoadOutcome::Failed
                } else {
                    LoadOutcome::Stale
                }
            }
        }
    }

    /// Starts a new chat.
    pub async fn clear_chat(&self) -> LoadOutcome {
        self.switch_conversation(None).await
    }

    pub async fn reset(&self) {
        let plan = self.with_session(ChatSession::reset);
        if let Some(plan) = plan {
            self.cancel_stream(plan.stream_id);
            self.delete_provisional(plan.message_id).await;
        }
    }

    pub async fn refresh_conversations(&self) -> Result<(), MessageStoreError> {
        let conversations = self.store.read_conversations().await?;
        self.with_session(|session| session.set_conversations(conversations));
        Ok(())
    }

    /// Seeds the message cache and conversation list in one read. Returns
    /// the number of cached conversations.
    pub async fn preload_cache(&self) -> Result<usize, MessageStoreError> {
        let conversations = self.store.read_conversations_with_messages().await?;
        let count = conversations.len();
        self.with_session(|session| session.initialize_cache(conversations));
        tracing::debug!(count, "message cache preloaded");
        Ok(count)
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<(), MessageStoreError> {
        self.store.rename_conversation(conversation_id, title).await?;
        self.refresh_conversations().await
    }

    /// Deletes a conversation; clears the chat when it was the current one.
    pub async fn delete_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), MessageStoreError> {
        self.store.delete_conversation(conversation_id).await?;
        let was_current =
            self.with_session(|session| session.forget_conversation(conversation_id));
        if was_current {
            self.clear_chat().await;
        }
        self.refresh_conversations().await
    }

    pub async fn delete_all_conversations(&self) -> Result<(), MessageStoreError> {
        self.store.delete_all_conversations().await?;
        self.with_session(ChatSession::forget_all_conversations);
        self.clear_chat().await;
        Ok(())
    }

    fn cancel_stream(&self, stream_id: StreamId) {
        let active = self.lock_active_stream();
        if let Some(active) = active.as_ref() {
            if active.stream_id == stream_id {
                active.cancel.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Best-effort removal of a provisionally persisted message.
    async fn delete_provisional(&self, message_id: StoredMessageId) {
        if let Err(error) = self.store.delete_message(message_id).await {
            tracing::warn!(message_id, %error, "failed to delete provisional message");
        }
    }

    fn clear_active_stream_if_matching(&self, stream_id: StreamId) {
        let mut active = self.lock_active_stream();
        if active.as_ref().map(|active| active.stream_id) == Some(stream_id) {
            active.take();
        }
    }

    fn lock_active_stream(&self) -> MutexGuard<'_, Option<ActiveStream>> {
        lock_unpoisoned(&self.active_stream)
    }
}

fn apply_stream_event(session: &mut ChatSession, event: StreamEvent) -> Option<Settlement> {
    match event {
        StreamEvent::Started { stream_id } => {
            session.on_stream_started(stream_id);
            None
        }
        StreamEvent::Part { stream_id, part } => {
            session.on_stream_part(stream_id, part);
            None
        }
        StreamEvent::Finished { stream_id } => session
            .on_stream_finished(stream_id)
            .then_some(Settlement::Committed),
        StreamEvent::Cancelled { stream_id } => Some(Settlement::Cancelled(
            session.on_stream_cancelled(stream_id),
        )),
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
