#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chat_session::controller::SessionController;
use chat_session::session::{ChatSession, Status};
use generation_provider::{ConversationId, GenerationProvider, Role};
use message_store::{
    ConversationSummary, ConversationWithMessages, InMemoryMessageStore, MessageStore,
    MessageStoreError, SavedMessage, StoredMessage, StoredMessageId,
};

/// In-memory store that counts reads and can be told to fail or yield.
#[derive(Default)]
pub struct TestStore {
    inner: InMemoryMessageStore,
    pub fail_save: AtomicBool,
    pub fail_delete: AtomicBool,
    pub yield_on_save: AtomicBool,
    pub read_message_calls: AtomicUsize,
    deleted: Mutex<Vec<StoredMessageId>>,
}

impl TestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn read_message_calls(&self) -> usize {
        self.read_message_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<StoredMessageId> {
        lock_unpoisoned(&self.deleted).clone()
    }

    /// Creates a conversation holding `texts`, alternating user and
    /// assistant roles.
    pub async fn seed(&self, texts: &[&str]) -> ConversationId {
        let mut conversation_id = None;
        for (index, text) in texts.iter().enumerate() {
            let role = if index % 2 == 0 {
                Role::User
            } else {
                Role::Assistant
            };
            let saved = self
                .inner
                .save(conversation_id, text, role)
                .await
                .expect("seed message saves");
            conversation_id = Some(saved.conversation_id);
        }
        conversation_id.expect("seed needs at least one message")
    }

    pub async fn contents(&self, conversation_id: ConversationId) -> Vec<String> {
        self.inner
            .read_messages(conversation_id)
            .await
            .expect("conversation readable")
            .into_iter()
            .map(|message| message.content)
            .collect()
    }
}

#[async_trait]
impl MessageStore for TestStore {
    async fn save(
        &self,
        conversation_id: Option<ConversationId>,
        text: &str,
        role: Role,
    ) -> Result<SavedMessage, MessageStoreError> {
        if self.yield_on_save.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(MessageStoreError::unavailable("saving", "database offline"));
        }
        self.inner.save(conversation_id, text, role).await
    }

    async fn delete_message(&self, message_id: StoredMessageId) -> Result<(), MessageStoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(MessageStoreError::unavailable("deleting", "database offline"));
        }
        lock_unpoisoned(&self.deleted).push(message_id);
        self.inner.delete_message(message_id).await
    }

    async fn read_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<StoredMessage>, MessageStoreError> {
        self.read_message_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.read_messages(conversation_id).await
    }

    async fn read_conversations(&self) -> Result<Vec<ConversationSummary>, MessageStoreError> {
        self.inner.read_conversations().await
    }

    async fn read_conversations_with_messages(
        &self,
    ) -> Result<Vec<ConversationWithMessages>, MessageStoreError> {
        self.inner.read_conversations_with_messages().await
    }

    async fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<(), MessageStoreError> {
        self.inner.rename_conversation(conversation_id, title).await
    }

    async fn delete_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), MessageStoreError> {
        self.inner.delete_conversation(conversation_id).await
    }

    async fn delete_all_conversations(&self) -> Result<(), MessageStoreError> {
        self.inner.delete_all_conversations().await
    }
}

pub fn controller(
    store: &Arc<TestStore>,
    provider: Arc<dyn GenerationProvider>,
) -> SessionController {
    let store: Arc<dyn MessageStore> = Arc::clone(store) as Arc<dyn MessageStore>;
    SessionController::new(Arc::new(Mutex::new(ChatSession::new())), store, provider)
}

pub fn message_contents(controller: &SessionController) -> Vec<String> {
    controller.with_session(|session| {
        session
            .messages()
            .iter()
            .map(|message| message.content.clone())
            .collect()
    })
}

/// Yields until the session reports an active stream.
pub async fn wait_for_streaming(controller: &SessionController) {
    for _ in 0..1_000 {
        let streaming = controller
            .with_session(|session| matches!(session.status(), Status::Streaming { .. }));
        if streaming {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("stream never started");
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
