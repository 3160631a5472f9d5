use chat_session::session::{ChatSession, PersistedOutcome, Status};
use generation_provider::{ContentPart, GenerationError};
use message_store::SavedMessage;
use pretty_assertions::assert_eq;

fn streaming_session(stream_id: u64) -> ChatSession {
    let mut session = ChatSession::new();
    let ticket = session.begin_submit("active prompt").expect("accepted");
    let outcome = session.on_persisted(
        ticket,
        SavedMessage {
            conversation_id: 1,
            message_id: 1,
        },
        stream_id,
    );
    assert!(matches!(outcome, PersistedOutcome::Stream { .. }));
    session
}

#[test]
fn stale_stream_events_are_ignored_while_different_stream_is_active() {
    let stale_stream = 10;
    let active_stream = 20;

    let mut session = streaming_session(active_stream);
    session.on_stream_started(active_stream);
    session.on_stream_part(active_stream, ContentPart::text("live output"));

    let snapshot_status = session.status();
    let snapshot_messages = session.messages().to_vec();

    session.on_stream_started(stale_stream);
    session.on_stream_part(stale_stream, ContentPart::text("stale chunk"));
    assert!(!session.on_stream_finished(stale_stream));
    assert_eq!(
        session.on_stream_failed(stale_stream, &GenerationError::Failed("stale".to_string())),
        None
    );
    assert_eq!(session.on_stream_cancelled(stale_stream), None);

    assert_eq!(session.status(), snapshot_status);
    assert_eq!(session.messages(), snapshot_messages.as_slice());
    assert!(session.pending().is_pending());

    session.on_stream_part(active_stream, ContentPart::text(" + still live"));
    assert_eq!(session.status(), Status::Streaming { stream_id: active_stream });
    assert_eq!(
        session.messages().last().map(|message| message.content.as_str()),
        Some("live output + still live")
    );
}

#[test]
fn events_after_commit_do_not_reopen_the_stream() {
    let mut session = streaming_session(3);
    session.on_stream_part(3, ContentPart::text("done"));
    assert!(session.on_stream_finished(3));
    let committed = session.messages().to_vec();

    session.on_stream_part(3, ContentPart::text(" late"));
    assert_eq!(
        session.on_stream_failed(3, &GenerationError::Failed("late".to_string())),
        None
    );

    assert_eq!(session.messages(), committed.as_slice());
    assert!(!session.pending().is_pending());
}
