use super::*;
use pretty_assertions::assert_eq;

fn busy_turn() -> ChatState {
    let mut state = streaming_state();
    stream(
        &mut state,
        AgentStreamEvent::MemoryRecall {
            query: "hello".to_string(),
            results_count: 0,
        },
    );
    stream(&mut state, AgentStreamEvent::tool_start("search", "{}"));
    stream(&mut state, AgentStreamEvent::tool_start("fetch", "{}"));
    stream(&mut state, AgentStreamEvent::tool_result("fetch", true, "ok"));
    stream(&mut state, AgentStreamEvent::text("partial"));
    state
}

#[test]
fn done_clears_all_turn_state() {
    let mut state = busy_turn();
    stream(&mut state, AgentStreamEvent::done("s1"));

    assert_turn_cleared(&state);
    assert_eq!(
        state.transcript.last().map(|m| m.content.as_str()),
        Some("partial")
    );
}

#[test]
fn error_clears_all_turn_state_and_reports() {
    let mut state = busy_turn();
    stream(&mut state, AgentStreamEvent::error("provider unavailable"));

    assert_turn_cleared(&state);
    assert_eq!(
        contents(&state),
        vec![
            (ChatRole::User, "hello".to_string()),
            (
                ChatRole::Assistant,
                format!("{BACKEND_ERROR_PREFIX}provider unavailable")
            ),
        ]
    );
}

#[test]
fn error_leaves_session_id_unchanged() {
    let mut state = streaming_state();
    accept(&mut state, "s1");

    stream(&mut state, AgentStreamEvent::error("boom"));

    assert_eq!(state.session_id, Some(SessionId::new("s1")));
}

#[test]
fn done_reassigns_session_id() {
    let mut state = streaming_state();
    accept(&mut state, "s1");

    stream(&mut state, AgentStreamEvent::done("s2"));

    assert_eq!(state.session_id, Some(SessionId::new("s2")));
}

#[test]
fn done_requests_catalog_reload() {
    let mut state = streaming_state();
    let effects = stream(&mut state, AgentStreamEvent::done("s1"));

    assert_eq!(
        effects,
        vec![ChatEffect::ReloadSessions, ChatEffect::RequestFrame]
    );
}

#[test]
fn error_reloads_catalog_only_when_session_is_known() {
    let mut state = streaming_state();
    let effects = stream(&mut state, AgentStreamEvent::error("boom"));
    assert_eq!(effects, vec![ChatEffect::RequestFrame]);

    send(&mut state, "again");
    accept(&mut state, "s1");
    let effects = stream(&mut state, AgentStreamEvent::error("boom"));
    assert_eq!(
        effects,
        vec![ChatEffect::ReloadSessions, ChatEffect::RequestFrame]
    );
}

#[test]
fn message_ids_stay_monotonic_through_terminal_events() {
    let mut state = streaming_state();
    stream(&mut state, AgentStreamEvent::text("one"));
    stream(&mut state, AgentStreamEvent::done("s1"));
    send(&mut state, "two");
    stream(&mut state, AgentStreamEvent::error("boom"));

    let ids: Vec<MessageId> = state.transcript.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![MessageId(0), MessageId(1), MessageId(2), MessageId(3)]);
}
