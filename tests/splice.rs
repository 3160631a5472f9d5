use assert_matches::assert_matches;
use cowrite::{
    Document, DocumentEditor, EditOutcome, MarkerError, MarkerPair, PendingSegment, SegmentParser,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn delete_parser() -> SegmentParser {
    SegmentParser::new(MarkerPair::delete())
}

fn segment_parser() -> SegmentParser {
    SegmentParser::new(MarkerPair::segment())
}

#[test]
fn buffer_without_markers_is_returned_unchanged() {
    let splice = delete_parser().remove_segments("plain text");
    assert_eq!(splice.text, "plain text");
    assert_eq!(splice.cursor, None);
    assert!(!splice.changed());
}

#[test]
fn delete_span_is_removed_and_cursor_placed_at_span_start() {
    let splice = delete_parser().remove_segments("A[DEL]X[/DEL]BC");
    assert_eq!(splice.text, "ABC");
    assert_eq!(splice.cursor, Some(1));
}

#[test]
fn every_span_is_removed_in_one_pass() {
    let splice = delete_parser().remove_segments("[DEL]a[/DEL]keep[DEL]b[/DEL]me");
    assert_eq!(splice.text, "keepme");
    assert_eq!(splice.cursor, Some(0));
}

#[test]
fn unmatched_trailing_marker_is_left_alone() {
    let splice = delete_parser().remove_segments("x[DEL]y[/DEL]z[DEL]tail");
    assert_eq!(splice.text, "xz[DEL]tail");
    assert_eq!(splice.cursor, Some(1));
}

#[test]
fn reversed_markers_are_not_a_span() {
    let splice = delete_parser().remove_segments("a[/DEL]b[DEL]c");
    assert_eq!(splice.text, "a[/DEL]b[DEL]c");
    assert_eq!(splice.cursor, None);
}

#[test]
fn pending_segment_replaces_first_occurrence_only() {
    let parser = segment_parser();
    let segment = PendingSegment::replace("X", "Y");

    assert_eq!(
        parser.replace_pending_segment("AXB", &segment),
        Some("AYB".to_string())
    );
    assert_eq!(
        parser.replace_pending_segment("XAX", &segment),
        Some("YAX".to_string())
    );
    assert_eq!(parser.replace_pending_segment("AB", &segment), None);
}

#[test]
fn empty_target_is_never_applied() {
    let segment = PendingSegment::replace("", "Y");
    assert_eq!(segment_parser().replace_pending_segment("AB", &segment), None);
}

#[test]
fn delete_segment_removes_target_text() {
    let segment = PendingSegment::delete("drop ");
    assert_eq!(
        segment_parser().replace_pending_segment("keep drop this", &segment),
        Some("keep this".to_string())
    );
}

#[test]
fn custom_markers_drive_the_editor() {
    let mut editor = DocumentEditor::new(
        MarkerPair::new("<<", ">>").expect("valid pair"),
        MarkerPair::new("{-", "-}").expect("valid pair"),
    );
    editor.open(Document::new(7, "Draft", ""));

    let outcome = editor.on_user_edit("one {-two -}three <<ask>>");

    assert_eq!(outcome, EditOutcome::Applied { cursor: Some(4) });
    assert_eq!(editor.content(), "one three <<ask>>");
    assert_eq!(editor.cursor(), 4);
    let command = editor.pending_command().expect("command span found");
    assert_eq!(command.instruction, "ask");
    assert_eq!(command.target, "<<ask>>");
}

#[test]
fn invalid_marker_pairs_are_rejected() {
    assert_matches!(MarkerPair::new("", "}}"), Err(MarkerError::EmptyDelimiter));
    assert_matches!(
        MarkerPair::new("@@", "@@"),
        Err(MarkerError::IdenticalDelimiters(delimiter)) if delimiter == "@@"
    );
}

fn buffer() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("[DEL]".to_string()),
            Just("[/DEL]".to_string()),
            "[a-z é]{0,4}",
        ],
        0..12,
    )
    .prop_map(|pieces| pieces.concat())
}

proptest! {
    #[test]
    fn removing_segments_is_idempotent(input in buffer()) {
        let parser = delete_parser();
        let once = parser.remove_segments(&input);
        let twice = parser.remove_segments(&once.text);

        prop_assert_eq!(&twice.text, &once.text);
        prop_assert_eq!(twice.cursor, None);
    }

    #[test]
    fn removal_never_grows_the_buffer(input in buffer()) {
        let splice = delete_parser().remove_segments(&input);
        prop_assert!(splice.text.len() <= input.len());
        if let Some(cursor) = splice.cursor {
            prop_assert!(cursor <= splice.text.chars().count());
        }
    }
}
