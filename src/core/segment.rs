/// What a pending segment does to its target text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Replace,
    Delete,
}

/// A single agent-produced patch directive waiting to be applied to a buffer.
///
/// The target is matched literally against the buffer at apply time, not at
/// creation time, so edits made in between are respected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSegment {
    kind: SegmentKind,
    target: String,
    replacement: String,
}

impl PendingSegment {
    #[must_use]
    pub fn replace(target: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Replace,
            target: target.into(),
            replacement: replacement.into(),
        }
    }

    #[must_use]
    pub fn delete(target: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Delete,
            target: target.into(),
            replacement: String::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Text written in place of the target; always empty for deletes.
    #[must_use]
    pub fn replacement(&self) -> &str {
        match self.kind {
            SegmentKind::Replace => &self.replacement,
            SegmentKind::Delete => "",
        }
    }
}

/// A command span found in the buffer, handed to the agent for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCommand {
    /// Full span text including delimiters; becomes the pending segment target.
    pub target: String,
    /// Trimmed text between the delimiters.
    pub instruction: String,
}

impl SegmentCommand {
    /// Builds the replace directive that swaps this span for `replacement`.
    #[must_use]
    pub fn into_segment(self, replacement: impl Into<String>) -> PendingSegment {
        PendingSegment::replace(self.target, replacement)
    }
}
