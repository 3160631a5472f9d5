//! Minimal provider-agnostic contract for one streamed generation.
//!
//! This crate defines only the request, the incremental event stream, the
//! cancellation flag, and the failure type shared by hosts and providers. It
//! excludes transport details and any multi-stream orchestration.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a persisted conversation.
pub type ConversationId = i64;

/// Identifier for one generation stream, unique per host.
pub type StreamId = u64;

/// Shared cooperative cancellation flag for a stream.
pub type CancelSignal = Arc<AtomicBool>;

#[must_use]
pub fn new_cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

#[must_use]
pub fn is_cancelled(cancel: &CancelSignal) -> bool {
    cancel.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One incremental piece of generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text { text: String },
    Reasoning { text: String },
    SourceUrl { url: String, title: Option<String> },
}

impl ContentPart {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the user-visible text carried by this part, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Reasoning { .. } | Self::SourceUrl { .. } => None,
        }
    }
}

/// Routing hint telling the service which generation profile to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatMode {
    #[default]
    Search,
    Fast,
    FastCode,
    Coding,
}

impl ChatMode {
    pub const ALL: [ChatMode; 4] = [Self::Search, Self::Fast, Self::FastCode, Self::Coding];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Fast => "fast",
            Self::FastCode => "fast-code",
            Self::Coding => "coding",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown chat mode '{0}' (expected one of: search, fast, fast-code, coding)")]
pub struct UnknownChatMode(pub String);

impl FromStr for ChatMode {
    type Err = UnknownChatMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownChatMode(trimmed.to_string()))
    }
}

/// Provider-neutral history item sent along with the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub text: String,
}

/// Input required to start a generation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub stream_id: StreamId,
    /// `None` for standalone prompts that belong to no conversation.
    pub conversation_id: Option<ConversationId>,
    pub mode: ChatMode,
    pub prompt: String,
    /// Prior turns, oldest first, excluding `prompt`.
    pub history: Vec<HistoryMessage>,
}

/// Provider-emitted lifecycle event for a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started { stream_id: StreamId },
    Part { stream_id: StreamId, part: ContentPart },
    Finished { stream_id: StreamId },
    Cancelled { stream_id: StreamId },
}

impl StreamEvent {
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Started { stream_id }
            | Self::Part { stream_id, .. }
            | Self::Finished { stream_id }
            | Self::Cancelled { stream_id } => *stream_id,
        }
    }

    /// Returns true when this event ends the stream lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Cancelled { .. })
    }
}

/// Failure signal raised by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Failed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    /// Message suitable for a one-line user notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Failed(message) | Self::Transport(message) if !message.trim().is_empty() => {
                message.clone()
            }
            Self::Timeout(_) => "The response took too long".to_string(),
            Self::Failed(_) | Self::Transport(_) => {
                "An error occurred while generating the response".to_string()
            }
        }
    }
}

/// Immutable metadata describing a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Provider interface for executing one generation request.
#[async_trait]
pub trait GenerationProvider: Send + Sync + 'static {
    fn profile(&self) -> ProviderProfile;

    /// Streams content for `request`, emitting events in provider order.
    ///
    /// Providers check `cancel` between parts and finish with
    /// [`StreamEvent::Cancelled`] once it is set. Content already emitted is
    /// not retracted; hosts own rollback. Failures are returned as `Err`.
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> Result<(), GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl GenerationProvider for EchoProvider {
        fn profile(&self) -> ProviderProfile {
            ProviderProfile {
                provider_id: "echo".to_string(),
                model_id: "echo-model".to_string(),
            }
        }

        async fn generate(
            &self,
            request: GenerationRequest,
            cancel: CancelSignal,
            emit: &mut (dyn FnMut(StreamEvent) + Send),
        ) -> Result<(), GenerationError> {
            let stream_id = request.stream_id;
            emit(StreamEvent::Started { stream_id });
            if is_cancelled(&cancel) {
                emit(StreamEvent::Cancelled { stream_id });
                return Ok(());
            }
            emit(StreamEvent::Part {
                stream_id,
                part: ContentPart::text(request.prompt),
            });
            emit(StreamEvent::Finished { stream_id });
            Ok(())
        }
    }

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest {
            stream_id: 3,
            conversation_id: Some(8),
            mode: ChatMode::Fast,
            prompt: prompt.to_string(),
            history: Vec::new(),
        }
    }

    #[test]
    fn stream_event_accessors_follow_lifecycle() {
        let events = [
            StreamEvent::Started { stream_id: 4 },
            StreamEvent::Part {
                stream_id: 4,
                part: ContentPart::text("x"),
            },
            StreamEvent::Finished { stream_id: 4 },
            StreamEvent::Cancelled { stream_id: 4 },
        ];

        for event in &events {
            assert_eq!(event.stream_id(), 4);
        }
        assert!(!events[0].is_terminal());
        assert!(!events[1].is_terminal());
        assert!(events[2].is_terminal());
        assert!(events[3].is_terminal());
    }

    #[test]
    fn chat_mode_parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("FAST-code".parse::<ChatMode>(), Ok(ChatMode::FastCode));
        assert_eq!(" search ".parse::<ChatMode>(), Ok(ChatMode::Search));
        assert_eq!(
            "turbo".parse::<ChatMode>(),
            Err(UnknownChatMode("turbo".to_string()))
        );
        assert_eq!(ChatMode::default(), ChatMode::Search);
    }

    #[test]
    fn content_parts_serialize_with_kebab_case_tags() {
        let part = ContentPart::SourceUrl {
            url: "https://example.com".to_string(),
            title: None,
        };
        let json = serde_json::to_value(&part).expect("part serializes");
        assert_eq!(json["type"], "source-url");
        assert_eq!(ContentPart::text("hi").as_text(), Some("hi"));
        assert_eq!(part.as_text(), None);
    }

    #[test]
    fn user_message_falls_back_for_blank_errors() {
        assert_eq!(
            GenerationError::Failed("quota exceeded".to_string()).user_message(),
            "quota exceeded"
        );
        assert_eq!(
            GenerationError::Transport("  ".to_string()).user_message(),
            "An error occurred while generating the response"
        );
    }

    #[tokio::test]
    async fn provider_emits_prompt_and_honours_cancel() {
        let provider = EchoProvider;
        let mut events = Vec::new();
        provider
            .generate(request("hello"), new_cancel_signal(), &mut |event| {
                events.push(event)
            })
            .await
            .expect("echo succeeds");
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            StreamEvent::Part {
                stream_id: 3,
                part: ContentPart::text("hello"),
            }
        );

        let cancel = new_cancel_signal();
        cancel.store(true, Ordering::SeqCst);
        let mut cancelled = Vec::new();
        provider
            .generate(request("hello"), cancel, &mut |event| cancelled.push(event))
            .await
            .expect("cancelled run still returns ok");
        assert_eq!(cancelled.last(), Some(&StreamEvent::Cancelled { stream_id: 3 }));
    }
}
