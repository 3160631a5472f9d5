//! Segment splice engine.
//!
//! Two modes share one marker grammar:
//! - delete mode strips every `START … END` span in a single left-to-right
//!   pass and reports where the cursor should land;
//! - replace mode resolves one [`PendingSegment`] by literal search.
//!
//! Output buffers are assembled from the untouched ranges of the input, so
//! span offsets are always measured against the original text and never
//! drift as spans are removed.

use crate::core::marker::MarkerPair;
use crate::core::segment::{PendingSegment, SegmentCommand};

/// Result of a delete-mode pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub text: String,
    /// Char offset where the first removed span began, or `None` when
    /// nothing was removed and the cursor should stay where it is.
    pub cursor: Option<usize>,
}

impl Splice {
    fn unchanged(buffer: &str) -> Self {
        Self {
            text: buffer.to_string(),
            cursor: None,
        }
    }

    /// True when the pass removed at least one span.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.cursor.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentParser {
    markers: MarkerPair,
}

impl SegmentParser {
    #[must_use]
    pub fn new(markers: MarkerPair) -> Self {
        Self { markers }
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerPair {
        &self.markers
    }

    /// Removes every well-formed span, delimiters included.
    ///
    /// Unclosed or reversed delimiters are left in place.
    #[must_use]
    pub fn remove_segments(&self, buffer: &str) -> Splice {
        let mut output = String::with_capacity(buffer.len());
        let mut cursor = None;
        let mut copied_to = 0;

        while let Some(span) = self.markers.locate_from(buffer, copied_to) {
            let outer = span.outer();
            output.push_str(&buffer[copied_to..outer.start]);
            if cursor.is_none() {
                cursor = Some(output.chars().count());
            }
            copied_to = outer.end;
        }

        if cursor.is_none() {
            return Splice::unchanged(buffer);
        }

        output.push_str(&buffer[copied_to..]);
        Splice {
            text: output,
            cursor,
        }
    }

    /// Applies `segment` to the first literal occurrence of its target.
    ///
    /// Returns `None` when the target is empty or no longer present; the
    /// caller discards the segment in that case.
    #[must_use]
    pub fn replace_pending_segment(&self, buffer: &str, segment: &PendingSegment) -> Option<String> {
        let target = segment.target();
        if target.is_empty() {
            return None;
        }

        let start = buffer.find(target)?;
        let end = start + target.len();
        let replacement = segment.replacement();

        let mut output = String::with_capacity(buffer.len() - target.len() + replacement.len());
        output.push_str(&buffer[..start]);
        output.push_str(replacement);
        output.push_str(&buffer[end..]);
        Some(output)
    }

    /// Returns the first span whose content is a non-blank instruction.
    #[must_use]
    pub fn extract_command(&self, buffer: &str) -> Option<SegmentCommand> {
        let mut from = 0;

        while let Some(span) = self.markers.locate_from(buffer, from) {
            let instruction = span.content_text(buffer).trim();
            if !instruction.is_empty() {
                return Some(SegmentCommand {
                    target: span.outer_text(buffer).to_string(),
                    instruction: instruction.to_string(),
                });
            }
            from = span.outer().end;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delete_parser() -> SegmentParser {
        SegmentParser::new(MarkerPair::delete())
    }

    #[test]
    fn delete_mode_removes_span_and_places_cursor_at_span_start() {
        let splice = delete_parser().remove_segments("A[DEL]X[/DEL]BC");
        assert_eq!(splice.text, "ABC");
        assert_eq!(splice.cursor, Some(1));
    }

    #[test]
    fn delete_mode_cursor_counts_chars_not_bytes() {
        let splice = delete_parser().remove_segments("日本[DEL]x[/DEL]語");
        assert_eq!(splice.text, "日本語");
        assert_eq!(splice.cursor, Some(2));
    }

    #[test]
    fn delete_mode_without_markers_is_identity() {
        let splice = delete_parser().remove_segments("plain text");
        assert_eq!(splice.text, "plain text");
        assert_eq!(splice.cursor, None);
        assert!(!splice.changed());
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        assert_eq!(
            delete_parser().remove_segments(""),
            Splice {
                text: String::new(),
                cursor: None,
            }
        );
    }

    #[test]
    fn replace_mode_swaps_first_literal_occurrence_only() {
        let parser = SegmentParser::new(MarkerPair::segment());
        let segment = PendingSegment::replace("X", "Y");

        assert_eq!(
            parser.replace_pending_segment("AXBX", &segment),
            Some("AYBX".to_string())
        );
    }

    #[test]
    fn replace_mode_with_empty_target_fails_closed() {
        let parser = SegmentParser::new(MarkerPair::segment());
        assert_eq!(
            parser.replace_pending_segment("abc", &PendingSegment::replace("", "zzz")),
            None
        );
    }

    #[test]
    fn extract_command_skips_blank_spans() {
        let parser = SegmentParser::new(MarkerPair::segment());
        let command = parser
            .extract_command("intro [SEG]  [/SEG] body [SEG] expand this [/SEG]")
            .expect("second span is a command");

        assert_eq!(command.target, "[SEG] expand this [/SEG]");
        assert_eq!(command.instruction, "expand this");
    }
}
