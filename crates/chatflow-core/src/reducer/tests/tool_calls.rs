use super::*;
use pretty_assertions::assert_eq;

fn statuses(state: &ChatState) -> Vec<(String, ToolCallStatus, Option<String>)> {
    state
        .active_tool_calls
        .iter()
        .map(|call| (call.name.clone(), call.status, call.output.clone()))
        .collect()
}

#[test]
fn result_resolves_running_call() {
    let mut state = streaming_state();
    stream(&mut state, AgentStreamEvent::tool_start("search", "{\"q\":\"x\"}"));
    stream(&mut state, AgentStreamEvent::tool_result("search", true, "3 hits"));

    assert_eq!(
        statuses(&state),
        vec![(
            "search".to_string(),
            ToolCallStatus::Success,
            Some("3 hits".to_string())
        )]
    );
    assert_eq!(state.active_tool_calls[0].arguments, "{\"q\":\"x\"}");
}

#[test]
fn failed_result_marks_error() {
    let mut state = streaming_state();
    stream(&mut state, AgentStreamEvent::tool_start("shell", "{}"));
    stream(&mut state, AgentStreamEvent::tool_result("shell", false, "exit 1"));

    assert_eq!(state.active_tool_calls[0].status, ToolCallStatus::Error);
}

#[test]
fn result_without_running_call_leaves_state_unchanged() {
    let mut state = streaming_state();
    stream(&mut state, AgentStreamEvent::tool_start("search", "{}"));
    let before = state.active_tool_calls.clone();

    let effects = stream(&mut state, AgentStreamEvent::tool_result("fetch", true, "ok"));

    assert!(effects.is_empty());
    assert_eq!(state.active_tool_calls, before);
}

#[test]
fn same_name_resolves_most_recent_running_call_first() {
    let mut state = streaming_state();
    stream(&mut state, AgentStreamEvent::tool_start("search", "{\"n\":1}"));
    stream(&mut state, AgentStreamEvent::tool_start("search", "{\"n\":2}"));

    stream(&mut state, AgentStreamEvent::tool_result("search", true, "second"));
    assert_eq!(state.active_tool_calls[0].status, ToolCallStatus::Running);
    assert_eq!(state.active_tool_calls[1].output.as_deref(), Some("second"));

    stream(&mut state, AgentStreamEvent::tool_result("search", true, "first"));
    assert_eq!(state.active_tool_calls[0].output.as_deref(), Some("first"));
}

#[test]
fn resolved_call_is_not_resolved_twice() {
    let mut state = streaming_state();
    stream(&mut state, AgentStreamEvent::tool_start("search", "{}"));
    stream(&mut state, AgentStreamEvent::tool_result("search", true, "once"));
    stream(&mut state, AgentStreamEvent::tool_result("search", false, "twice"));

    assert_eq!(
        statuses(&state),
        vec![(
            "search".to_string(),
            ToolCallStatus::Success,
            Some("once".to_string())
        )]
    );
}

#[test]
fn call_id_correlates_overlapping_calls() {
    let mut state = streaming_state();
    for id in ["c-1", "c-2"] {
        stream(
            &mut state,
            AgentStreamEvent::ToolCallStart {
                name: "search".to_string(),
                arguments: "{}".to_string(),
                call_id: Some(id.to_string()),
            },
        );
    }

    stream(
        &mut state,
        AgentStreamEvent::ToolCallResult {
            name: "search".to_string(),
            success: true,
            output: "for c-1".to_string(),
            call_id: Some("c-1".to_string()),
        },
    );

    assert_eq!(state.active_tool_calls[0].output.as_deref(), Some("for c-1"));
    assert_eq!(state.active_tool_calls[1].status, ToolCallStatus::Running);
}

#[test]
fn result_with_unknown_call_id_skips_calls_started_under_other_ids() {
    let mut state = streaming_state();
    stream(
        &mut state,
        AgentStreamEvent::ToolCallStart {
            name: "search".to_string(),
            arguments: "{}".to_string(),
            call_id: Some("c-1".to_string()),
        },
    );
    let before = state.active_tool_calls.clone();

    stream(
        &mut state,
        AgentStreamEvent::ToolCallResult {
            name: "search".to_string(),
            success: true,
            output: "stray".to_string(),
            call_id: Some("c-9".to_string()),
        },
    );

    assert_eq!(state.active_tool_calls, before);
}

#[test]
fn done_before_result_abandons_running_call() {
    let mut state = streaming_state();
    stream(&mut state, AgentStreamEvent::tool_start("search", "{}"));
    stream(&mut state, AgentStreamEvent::done("s1"));

    assert!(state.active_tool_calls.is_empty());
    assert!(state.activities.is_empty());

    let effects = stream(&mut state, AgentStreamEvent::tool_result("search", true, "late"));
    assert!(effects.is_empty());
    assert!(state.active_tool_calls.is_empty());
}
