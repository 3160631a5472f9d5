//! Document editor state shared between the human typist and the agent.
//!
//! Every user edit runs through delete-mode splicing before it is stored.
//! Agent patches arrive as a single [`PendingSegment`] and are resolved
//! against whatever the buffer holds at that moment.

use crate::config::EnvConfig;
use crate::core::marker::MarkerPair;
use crate::core::segment::{PendingSegment, SegmentCommand};
use crate::core::splice::SegmentParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new(id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// No document is open.
    Ignored,
    /// The edit was stored. `cursor` is set when delete spans were removed.
    Applied { cursor: Option<usize> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentResolution {
    /// Nothing was pending.
    Idle,
    /// The target was found and the buffer changed.
    Applied,
    /// The target was found but replacing it left the buffer as it was.
    Unchanged,
    /// The target is gone or no document is open; the segment was dropped.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct DocumentEditor {
    document: Option<Document>,
    cursor: usize,
    pending: Option<PendingSegment>,
    segment_parser: SegmentParser,
    delete_parser: SegmentParser,
}

impl Default for DocumentEditor {
    fn default() -> Self {
        Self::new(MarkerPair::segment(), MarkerPair::delete())
    }
}

impl DocumentEditor {
    pub fn new(segment_markers: MarkerPair, delete_markers: MarkerPair) -> Self {
        Self {
            document: None,
            cursor: 0,
            pending: None,
            segment_parser: SegmentParser::new(segment_markers),
            delete_parser: SegmentParser::new(delete_markers),
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.segment_markers.clone(), config.delete_markers.clone())
    }

    /// Opens `document` with the cursor at the end of its content.
    pub fn open(&mut self, document: Document) {
        self.cursor = document.content.chars().count();
        self.pending = None;
        self.document = Some(document);
    }

    pub fn close(&mut self) -> Option<Document> {
        self.pending = None;
        self.cursor = 0;
        self.document.take()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Current buffer text; empty when no document is open.
    pub fn content(&self) -> &str {
        self.document
            .as_ref()
            .map_or("", |document| document.content.as_str())
    }

    /// Cursor as a char offset into [`DocumentEditor::content`].
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.content().chars().count());
    }

    /// Stores a user edit after stripping delete spans from it.
    pub fn on_user_edit(&mut self, text: impl Into<String>) -> EditOutcome {
        let Some(document) = self.document.as_mut() else {
            return EditOutcome::Ignored;
        };

        let text: String = text.into();
        let splice = self.delete_parser.remove_segments(&text);
        document.content = splice.text;

        let len = document.content.chars().count();
        if let Some(cursor) = splice.cursor {
            tracing::debug!(document_id = document.id, cursor, "removed delete spans");
            self.cursor = cursor;
        }
        self.cursor = self.cursor.min(len);

        EditOutcome::Applied {
            cursor: splice.cursor,
        }
    }

    /// Stages `segment`, replacing any segment still waiting.
    pub fn stage_segment(&mut self, segment: PendingSegment) {
        if let Some(previous) = self.pending.replace(segment) {
            tracing::debug!(target_text = previous.target(), "replaced unresolved pending segment");
        }
    }

    pub fn pending_segment(&self) -> Option<&PendingSegment> {
        self.pending.as_ref()
    }

    /// Applies the staged segment to the current buffer. The slot is always
    /// cleared, whatever the outcome.
    pub fn resolve_pending_segment(&mut self) -> SegmentResolution {
        let Some(segment) = self.pending.take() else {
            return SegmentResolution::Idle;
        };

        let Some(document) = self.document.as_mut() else {
            return SegmentResolution::Discarded;
        };

        let Some(updated) = self
            .segment_parser
            .replace_pending_segment(&document.content, &segment)
        else {
            tracing::debug!(
                document_id = document.id,
                "pending segment target no longer present; discarding"
            );
            return SegmentResolution::Discarded;
        };

        if updated == document.content {
            return SegmentResolution::Unchanged;
        }

        if let Some(byte_start) = document.content.find(segment.target()) {
            let start = document.content[..byte_start].chars().count();
            let removed = segment.target().chars().count();
            let inserted = segment.replacement().chars().count();
            self.cursor = shift_cursor(self.cursor, start, removed, inserted);
        }

        document.content = updated;
        self.cursor = self.cursor.min(document.content.chars().count());
        SegmentResolution::Applied
    }

    /// First command span in the buffer, if any.
    pub fn pending_command(&self) -> Option<SegmentCommand> {
        self.segment_parser.extract_command(self.content())
    }
}

fn shift_cursor(cursor: usize, start: usize, removed: usize, inserted: usize) -> usize {
    if cursor >= start + removed {
        cursor - removed + inserted
    } else if cursor > start {
        start + inserted
    } else {
        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_editor(content: &str) -> DocumentEditor {
        let mut editor = DocumentEditor::default();
        editor.open(Document::new(1, "notes", content));
        editor
    }

    #[test]
    fn open_places_cursor_at_end() {
        let editor = open_editor("héllo");
        assert_eq!(editor.cursor(), 5);
    }

    #[test]
    fn edit_without_document_is_ignored() {
        let mut editor = DocumentEditor::default();
        assert_eq!(editor.on_user_edit("text"), EditOutcome::Ignored);
        assert_eq!(editor.content(), "");
    }

    #[test]
    fn user_edit_strips_delete_spans_and_moves_cursor() {
        let mut editor = open_editor("");
        let outcome = editor.on_user_edit("A[DEL]X[/DEL]BC");

        assert_eq!(outcome, EditOutcome::Applied { cursor: Some(1) });
        assert_eq!(editor.content(), "ABC");
        assert_eq!(editor.cursor(), 1);
    }

    #[test]
    fn resolve_discards_segment_whose_target_was_edited_away() {
        let mut editor = open_editor("AXB");
        editor.stage_segment(PendingSegment::replace("X", "Y"));
        editor.on_user_edit("AB");

        assert_eq!(editor.resolve_pending_segment(), SegmentResolution::Discarded);
        assert_eq!(editor.content(), "AB");
        assert!(editor.pending_segment().is_none());
    }

    #[test]
    fn resolve_applies_segment_and_keeps_cursor_after_span_stable() {
        let mut editor = open_editor("AXB");
        editor.set_cursor(3);
        editor.stage_segment(PendingSegment::replace("X", "YYY"));

        assert_eq!(editor.resolve_pending_segment(), SegmentResolution::Applied);
        assert_eq!(editor.content(), "AYYYB");
        assert_eq!(editor.cursor(), 5);
    }

    #[test]
    fn resolve_without_pending_segment_is_idle() {
        let mut editor = open_editor("text");
        assert_eq!(editor.resolve_pending_segment(), SegmentResolution::Idle);
    }

    #[test]
    fn staging_replaces_previous_segment() {
        let mut editor = open_editor("one two");
        editor.stage_segment(PendingSegment::replace("one", "1"));
        editor.stage_segment(PendingSegment::delete(" two"));

        assert_eq!(editor.resolve_pending_segment(), SegmentResolution::Applied);
        assert_eq!(editor.content(), "one");
    }

    #[test]
    fn shift_cursor_collapses_into_replaced_span() {
        assert_eq!(shift_cursor(1, 2, 3, 1), 1);
        assert_eq!(shift_cursor(3, 2, 3, 1), 3);
        assert_eq!(shift_cursor(6, 2, 3, 1), 4);
    }
}
