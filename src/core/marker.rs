//! Marker grammar: delimiter pairs that embed agent directives in free text.
//!
//! A span is `START content END`. Matching is leftmost and non-greedy: the
//! first `START` opens the span and the first `END` after it closes it. An
//! `END` with no `START` before it, or a `START` that is never closed, does
//! not form a span. Callers treat "no span" as a no-op, never as an error,
//! because the buffer is edited by a human at the same time.

use std::ops::Range;

use thiserror::Error;

/// Default delimiters for insert/replace directives.
pub const SEGMENT_START: &str = "[SEG]";
pub const SEGMENT_END: &str = "[/SEG]";

/// Default delimiters for delete directives.
pub const DELETE_START: &str = "[DEL]";
pub const DELETE_END: &str = "[/DEL]";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("marker delimiters must not be empty")]
    EmptyDelimiter,

    #[error("start and end delimiters must differ (both are '{0}')")]
    IdenticalDelimiters(String),
}

/// Which directive a marker pair encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Segment,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    start: String,
    end: String,
}

impl MarkerPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self, MarkerError> {
        let start = start.into();
        let end = end.into();

        if start.is_empty() || end.is_empty() {
            return Err(MarkerError::EmptyDelimiter);
        }

        if start == end {
            return Err(MarkerError::IdenticalDelimiters(start));
        }

        Ok(Self { start, end })
    }

    /// Built-in pair for `kind`.
    #[must_use]
    pub fn default_for(kind: MarkerKind) -> Self {
        let (start, end) = match kind {
            MarkerKind::Segment => (SEGMENT_START, SEGMENT_END),
            MarkerKind::Delete => (DELETE_START, DELETE_END),
        };

        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    #[must_use]
    pub fn segment() -> Self {
        Self::default_for(MarkerKind::Segment)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::default_for(MarkerKind::Delete)
    }

    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    #[must_use]
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Returns the first well-formed span in `text`.
    #[must_use]
    pub fn locate(&self, text: &str) -> Option<MarkedSpan> {
        self.locate_from(text, 0)
    }

    /// Returns the first well-formed span starting at or after byte `from`.
    ///
    /// `from` past the end of `text` or off a char boundary yields `None`.
    #[must_use]
    pub fn locate_from(&self, text: &str, from: usize) -> Option<MarkedSpan> {
        let haystack = text.get(from..)?;
        let start = from + haystack.find(&self.start)?;
        let content_start = start + self.start.len();
        let content_end = content_start + text[content_start..].find(&self.end)?;
        let end = content_end + self.end.len();

        Some(MarkedSpan {
            outer: start..end,
            content: content_start..content_end,
        })
    }
}

/// Byte ranges of one located span within the buffer it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedSpan {
    outer: Range<usize>,
    content: Range<usize>,
}

impl MarkedSpan {
    /// Range covering both delimiters and the content.
    #[must_use]
    pub fn outer(&self) -> Range<usize> {
        self.outer.clone()
    }

    /// Range covering the content only.
    #[must_use]
    pub fn content(&self) -> Range<usize> {
        self.content.clone()
    }

    #[must_use]
    pub fn outer_text<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.outer.clone()]
    }

    #[must_use]
    pub fn content_text<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.content.clone()]
    }
}
