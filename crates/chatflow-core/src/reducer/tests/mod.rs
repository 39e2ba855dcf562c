use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::ChatEffect;
pub(super) use super::BACKEND_ERROR_PREFIX;
pub(super) use super::SEND_FAILURE_PREFIX;
pub(super) use crate::actions::ChatAction;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::catalog::SessionDetail;
pub(super) use crate::catalog::SessionMessage;
pub(super) use crate::catalog::SessionSummary;
pub(super) use crate::events::AgentStreamEvent;
pub(super) use crate::state::ActivityKind;
pub(super) use crate::state::ChatRole;
pub(super) use crate::state::ChatState;
pub(super) use crate::state::MessageId;
pub(super) use crate::state::SessionId;
pub(super) use crate::state::ToolCallStatus;

mod session_reset;
mod terminal_events;
mod tool_calls;

const NOW_MS: i64 = 1_700_000_000_000;

fn state() -> ChatState {
    ChatState::new()
}

fn send(state: &mut ChatState, content: &str) -> Vec<ChatEffect> {
    reduce(state, ChatAction::send(content))
}

fn stream(state: &mut ChatState, event: AgentStreamEvent) -> Vec<ChatEffect> {
    let generation = state.generation;
    reduce(state, ChatAction::stream(generation, NOW_MS, event))
}

fn accept(state: &mut ChatState, session_id: &str) -> Vec<ChatEffect> {
    let generation = state.generation;
    reduce(
        state,
        ChatAction::Runtime(RuntimeAction::SendAccepted {
            generation,
            session_id: session_id.to_string(),
        }),
    )
}

fn streaming_state() -> ChatState {
    let mut state = state();
    send(&mut state, "hello");
    state
}

fn contents(state: &ChatState) -> Vec<(ChatRole, String)> {
    state
        .transcript
        .iter()
        .map(|message| (message.role, message.content.clone()))
        .collect()
}

fn submitted(effects: &[ChatEffect]) -> Option<(Option<SessionId>, String)> {
    effects.iter().find_map(|effect| match effect {
        ChatEffect::SubmitMessage {
            session_id,
            message,
            ..
        } => Some((session_id.clone(), message.clone())),
        _ => None,
    })
}

fn session_detail(id: &str, messages: &[(&str, &str)]) -> SessionDetail {
    SessionDetail {
        summary: SessionSummary {
            id: id.to_string(),
            title: "Earlier chat".to_string(),
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            message_count: messages.len() as i64,
        },
        messages: messages
            .iter()
            .enumerate()
            .map(|(idx, (role, content))| SessionMessage {
                id: format!("db-{idx}"),
                session_id: id.to_string(),
                role: role.to_string(),
                content: content.to_string(),
                tool_name: None,
                tool_args: None,
                tool_success: None,
                timestamp: "2025-01-01T00:00:00Z".to_string(),
                sequence: idx as i64 + 1,
            })
            .collect(),
    }
}

fn assert_turn_cleared(state: &ChatState) {
    assert!(!state.is_streaming());
    assert_eq!(state.streaming_text, "");
    assert!(state.active_tool_calls.is_empty());
    assert!(state.activities.is_empty());
}
