//! Deterministic scripted implementation of the `generation_provider`
//! contract.
//!
//! Each `generate` call consumes the next queued [`Script`]; when the queue is
//! empty the default script runs. Text parts are streamed word by word, and
//! the provider yields to the executor between parts so that a host running
//! on a single task can interleave other work with an in-flight stream.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use generation_provider::{
    is_cancelled, CancelSignal, ContentPart, GenerationError, GenerationProvider,
    GenerationRequest, ProviderProfile, StreamEvent, StreamId,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Behaviour of one scripted stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Streams `parts` and finishes.
    Complete(Vec<ContentPart>),
    /// Streams `parts`, then fails with `error`.
    FailAfter {
        parts: Vec<ContentPart>,
        error: GenerationError,
    },
    /// Streams `parts`, then waits until cancelled.
    HoldUntilCancelled(Vec<ContentPart>),
}

impl Script {
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Complete(vec![ContentPart::text(text)])
    }

    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::FailAfter {
            parts: Vec::new(),
            error: GenerationError::Failed(message.into()),
        }
    }

    fn parts(&self) -> &[ContentPart] {
        match self {
            Self::Complete(parts)
            | Self::FailAfter { parts, .. }
            | Self::HoldUntilCancelled(parts) => parts,
        }
    }
}

#[derive(Debug)]
pub struct ScriptedProvider {
    default_script: Script,
    queued: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
    part_delay: Option<Duration>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new(Script::Complete(vec![
            ContentPart::Reasoning {
                text: "Looking at the question.".to_string(),
            },
            ContentPart::text("This is a mocked answer. "),
            ContentPart::text("It streams word by word and then completes."),
        ]))
    }
}

impl ScriptedProvider {
    /// Creates a provider that runs `default_script` whenever the queue is empty.
    #[must_use]
    pub fn new(default_script: Script) -> Self {
        Self {
            default_script,
            queued: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            part_delay: None,
        }
    }

    /// Sleeps for `delay` between emitted parts instead of only yielding.
    #[must_use]
    pub fn with_part_delay(mut self, delay: Duration) -> Self {
        self.part_delay = Some(delay);
        self
    }

    /// Queues `script` for the next unscripted `generate` call.
    pub fn push_script(&self, script: Script) {
        lock_unpoisoned(&self.queued).push_back(script);
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    fn next_script(&self) -> Script {
        lock_unpoisoned(&self.queued)
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone())
    }

    async fn pause(&self) {
        match self.part_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }

    /// Emits `parts`, returning `false` if cancellation was observed first.
    async fn stream_parts(
        &self,
        stream_id: StreamId,
        parts: &[ContentPart],
        cancel: &CancelSignal,
        emit: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> bool {
        for part in parts {
            for piece in split_part(part) {
                if is_cancelled(cancel) {
                    return false;
                }

                emit(StreamEvent::Part {
                    stream_id,
                    part: piece,
                });
                self.pause().await;
            }
        }

        !is_cancelled(cancel)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: "scripted".to_string(),
        }
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> Result<(), GenerationError> {
        let stream_id = request.stream_id;
        lock_unpoisoned(&self.requests).push(request);
        let script = self.next_script();

        emit(StreamEvent::Started { stream_id });
        self.pause().await;

        if !self
            .stream_parts(stream_id, script.parts(), &cancel, emit)
            .await
        {
            emit(StreamEvent::Cancelled { stream_id });
            return Ok(());
        }

        match script {
            Script::Complete(_) => {
                emit(StreamEvent::Finished { stream_id });
                Ok(())
            }
            Script::FailAfter { error, .. } => Err(error),
            Script::HoldUntilCancelled(_) => {
                while !is_cancelled(&cancel) {
                    self.pause().await;
                }
                emit(StreamEvent::Cancelled { stream_id });
                Ok(())
            }
        }
    }
}

/// Splits text parts into word-sized pieces; other parts pass through whole.
fn split_part(part: &ContentPart) -> Vec<ContentPart> {
    let ContentPart::Text { text } = part else {
        return vec![part.clone()];
    };

    let mut pieces = Vec::new();
    let mut pending = String::new();
    for ch in text.chars() {
        pending.push(ch);
        if matches!(ch, ' ' | '\n') {
            pieces.push(ContentPart::text(std::mem::take(&mut pending)));
        }
    }
    if !pending.is_empty() {
        pieces.push(ContentPart::text(pending));
    }

    pieces
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
