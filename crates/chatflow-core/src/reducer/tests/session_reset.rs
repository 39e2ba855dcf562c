use super::*;
use pretty_assertions::assert_eq;

#[test]
fn new_session_resets_everything_and_resubscribes() {
    let mut state = streaming_state();
    accept(&mut state, "s1");
    stream(&mut state, AgentStreamEvent::text("partial"));

    let effects = reduce(&mut state, ChatAction::User(UserAction::NewSession));

    assert!(state.transcript.is_empty());
    assert_turn_cleared(&state);
    assert_eq!(state.session_id, None);
    assert_eq!(state.next_message_seq, 0);
    assert_eq!(state.generation, 1);
    assert_eq!(
        effects,
        vec![
            ChatEffect::Resubscribe { generation: 1 },
            ChatEffect::RequestFrame
        ]
    );
}

#[test]
fn events_from_superseded_subscription_are_dropped() {
    let mut state = streaming_state();
    let old_generation = state.generation;
    reduce(&mut state, ChatAction::User(UserAction::NewSession));

    for event in [
        AgentStreamEvent::text("late"),
        AgentStreamEvent::tool_start("search", "{}"),
        AgentStreamEvent::done("s-old"),
    ] {
        let effects = reduce(&mut state, ChatAction::stream(old_generation, NOW_MS, event));
        assert!(effects.is_empty());
    }

    assert!(state.transcript.is_empty());
    assert_turn_cleared(&state);
    assert_eq!(state.session_id, None);
}

#[test]
fn continue_session_hydrates_and_bumps_generation() {
    let mut state = streaming_state();

    let effects = reduce(
        &mut state,
        ChatAction::User(UserAction::ContinueSession(session_detail(
            "s9",
            &[("user", "earlier"), ("assistant", "reply")],
        ))),
    );

    assert_eq!(
        contents(&state),
        vec![
            (ChatRole::User, "earlier".to_string()),
            (ChatRole::Assistant, "reply".to_string()),
        ]
    );
    assert_eq!(state.session_id, Some(SessionId::new("s9")));
    assert_turn_cleared(&state);
    assert_eq!(
        effects,
        vec![
            ChatEffect::Resubscribe { generation: 1 },
            ChatEffect::RequestFrame
        ]
    );
}

#[test]
fn continue_then_send_mints_non_colliding_id() {
    let mut state = state();
    reduce(
        &mut state,
        ChatAction::User(UserAction::ContinueSession(session_detail(
            "s9",
            &[("user", "a"), ("assistant", "b"), ("user", "c")],
        ))),
    );
    let hydrated_max = state
        .transcript
        .iter()
        .map(|m| m.id)
        .max()
        .expect("hydrated messages");

    let effects = send(&mut state, "next");

    let new_id = state.transcript.last().expect("user message").id;
    assert!(new_id > hydrated_max);
    assert_eq!(new_id, MessageId(3));
    assert_eq!(
        submitted(&effects),
        Some((Some(SessionId::new("s9")), "next".to_string()))
    );
}
