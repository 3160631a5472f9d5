use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cowrite::{DocumentEditor, SegmentResolution};
use generation_provider::{
    new_cancel_signal, ChatMode, GenerationError, GenerationProvider, GenerationRequest,
    StreamEvent,
};
use thiserror::Error;

use crate::controller::lock_unpoisoned;

#[derive(Debug, Error)]
pub enum DocumentAgentError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("generation was cancelled before producing a replacement")]
    Cancelled,

    #[error("generation produced no replacement text")]
    EmptyReply,
}

/// Answers command segments embedded in a document.
///
/// The replacement is resolved against whatever the buffer holds when the
/// provider finishes, so edits made in the meantime are kept.
pub struct DocumentAgent {
    provider: Arc<dyn GenerationProvider>,
    mode: ChatMode,
    next_stream_id: AtomicU64,
}

impl DocumentAgent {
    pub fn new(provider: Arc<dyn GenerationProvider>, mode: ChatMode) -> Self {
        Self {
            provider,
            mode,
            next_stream_id: AtomicU64::new(1),
        }
    }

    pub async fn process(
        &self,
        editor: &Mutex<DocumentEditor>,
    ) -> Result<SegmentResolution, DocumentAgentError> {
        let Some(command) = lock_unpoisoned(editor).pending_command() else {
            return Ok(SegmentResolution::Idle);
        };

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let request = GenerationRequest {
            stream_id,
            conversation_id: None,
            mode: self.mode,
            prompt: command.instruction.clone(),
            history: Vec::new(),
        };

        let mut reply = String::new();
        let mut cancelled = false;
        let result = self
            .provider
            .generate(request, new_cancel_signal(), &mut |event: StreamEvent| match event {
                StreamEvent::Part { part, .. } => {
                    if let Some(text) = part.as_text() {
                        reply.push_str(text);
                    }
                }
                StreamEvent::Cancelled { .. } => cancelled = true,
                StreamEvent::Started { .. } | StreamEvent::Finished { .. } => {}
            })
            .await;

        if let Err(error) = result {
            tracing::warn!(stream_id, %error, "document command generation failed");
            return Err(error.into());
        }
        if cancelled {
            return Err(DocumentAgentError::Cancelled);
        }
        if reply.trim().is_empty() {
            return Err(DocumentAgentError::EmptyReply);
        }

        let mut editor = lock_unpoisoned(editor);
        editor.stage_segment(command.into_segment(reply));
        let resolution = editor.resolve_pending_segment();
        tracing::debug!(stream_id, ?resolution, "document command resolved");
        Ok(resolution)
    }
}
