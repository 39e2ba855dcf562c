#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEffect {
    /// Forward a user turn to the backend.
    SubmitMessage {
        generation: u64,
        session_id: Option<SessionId>,
        message: String,
    },
    /// Drop the current event subscription and open a new one for
    /// `generation`.
    Resubscribe { generation: u64 },
    /// Refresh the session catalog listing.
    ReloadSessions,
    RequestFrame,
}

use super::actions::ChatAction;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::events::AgentStreamEvent;
use super::hydrate::hydrate;
use super::state::ActivityKind;
use super::state::ChatState;
use super::state::SessionId;
use super::state::ToolCallActivity;
use super::state::ToolCallStatus;
use super::state::TurnPhase;

pub const SEND_FAILURE_PREFIX: &str = "Failed to send message: ";
pub const BACKEND_ERROR_PREFIX: &str = "Error: ";

pub fn reduce(state: &mut ChatState, action: ChatAction) -> Vec<ChatEffect> {
    match action {
        ChatAction::User(user) => reduce_user(state, user),
        ChatAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut ChatState, action: UserAction) -> Vec<ChatEffect> {
    match action {
        UserAction::SendMessage { content } => {
            let content = content.trim();
            if content.is_empty() {
                return Vec::new();
            }
            if state.is_streaming() {
                tracing::debug!("send ignored: a turn is already in flight");
                return Vec::new();
            }

            state.push_user(content);
            state.phase = TurnPhase::Streaming;
            state.clear_turn();

            vec![
                ChatEffect::SubmitMessage {
                    generation: state.generation,
                    session_id: state.session_id.clone(),
                    message: content.to_string(),
                },
                ChatEffect::RequestFrame,
            ]
        }
        UserAction::NewSession => {
            let generation = state.generation + 1;
            *state = ChatState::with_generation(generation);
            vec![
                ChatEffect::Resubscribe { generation },
                ChatEffect::RequestFrame,
            ]
        }
        UserAction::ContinueSession(detail) => {
            let generation = state.generation + 1;
            state.generation = generation;
            hydrate(state, detail);
            vec![
                ChatEffect::Resubscribe { generation },
                ChatEffect::RequestFrame,
            ]
        }
    }
}

fn reduce_runtime(state: &mut ChatState, action: RuntimeAction) -> Vec<ChatEffect> {
    match action {
        RuntimeAction::StreamEvent {
            generation,
            received_at_ms,
            event,
        } => {
            if !state.is_current(generation) {
                tracing::debug!(
                    event = event.kind(),
                    generation,
                    current = state.generation,
                    "dropping event from superseded subscription"
                );
                return Vec::new();
            }
            apply_stream_event(state, event, received_at_ms)
        }
        RuntimeAction::SendAccepted {
            generation,
            session_id,
        } => {
            if !state.is_current(generation) {
                tracing::debug!(%session_id, "ignoring send result for superseded session");
                return Vec::new();
            }
            state.session_id = Some(SessionId::new(session_id));
            vec![ChatEffect::RequestFrame]
        }
        RuntimeAction::SendFailed { generation, error } => {
            if !state.is_current(generation) {
                tracing::debug!(%error, "ignoring send failure for superseded session");
                return Vec::new();
            }
            state.push_assistant(format!("{SEND_FAILURE_PREFIX}{error}"));
            state.phase = TurnPhase::Idle;
            vec![ChatEffect::RequestFrame]
        }
    }
}

fn apply_stream_event(
    state: &mut ChatState,
    event: AgentStreamEvent,
    received_at_ms: i64,
) -> Vec<ChatEffect> {
    match event {
        AgentStreamEvent::TextChunk { content } => {
            state.streaming_text.push_str(&content);
        }
        AgentStreamEvent::ToolCallStart {
            name,
            arguments,
            call_id,
        } => {
            state.activities.push(
                ActivityKind::Tool,
                format!("Running {name}..."),
                received_at_ms,
            );
            state.active_tool_calls.push(ToolCallActivity {
                call_id,
                name,
                arguments,
                status: ToolCallStatus::Running,
                output: None,
            });
        }
        AgentStreamEvent::ToolCallResult {
            name,
            success,
            output,
            call_id,
        } => {
            let Some(call) = find_running_call(state, &name, call_id.as_deref()) else {
                tracing::debug!(tool = %name, "tool result without a running call");
                return Vec::new();
            };
            call.status = ToolCallStatus::from_success(success);
            call.output = Some(output);
        }
        AgentStreamEvent::MemoryRecall { results_count, .. } => {
            state.activities.push(
                ActivityKind::Memory,
                format!("Searching memory... ({results_count} results)"),
                received_at_ms,
            );
        }
        AgentStreamEvent::ProviderCallStart { provider, model } => {
            state.activities.push(
                ActivityKind::Provider,
                format!("Calling {provider} ({model})..."),
                received_at_ms,
            );
        }
        AgentStreamEvent::ProviderCallEnd { duration_ms } => {
            tracing::debug!(duration_ms, "provider call finished");
            return Vec::new();
        }
        AgentStreamEvent::Done { session_id } => {
            if !state.streaming_text.is_empty() {
                let content = std::mem::take(&mut state.streaming_text);
                state.push_assistant(content);
            }
            state.clear_turn();
            state.phase = TurnPhase::Idle;
            state.session_id = Some(SessionId::new(session_id));
            return vec![ChatEffect::ReloadSessions, ChatEffect::RequestFrame];
        }
        AgentStreamEvent::Error { message } => {
            state.push_assistant(format!("{BACKEND_ERROR_PREFIX}{message}"));
            state.clear_turn();
            state.phase = TurnPhase::Idle;
            if state.session_id.is_some() {
                return vec![ChatEffect::ReloadSessions, ChatEffect::RequestFrame];
            }
        }
    }

    vec![ChatEffect::RequestFrame]
}

/// Picks the call a result resolves.
///
/// A call id on both sides wins. Otherwise the most recently started running
/// call with the same name is used, which is ambiguous when two calls of the
/// same tool overlap. A result carrying an id never resolves a call that was
/// started under a different id.
fn find_running_call<'a>(
    state: &'a mut ChatState,
    name: &str,
    call_id: Option<&str>,
) -> Option<&'a mut ToolCallActivity> {
    let calls = &state.active_tool_calls;
    let idx = match call_id {
        Some(call_id) => calls
            .iter()
            .rposition(|call| call.is_running() && call.call_id.as_deref() == Some(call_id))
            .or_else(|| {
                calls.iter().rposition(|call| {
                    call.is_running() && call.call_id.is_none() && call.name == name
                })
            }),
        None => calls
            .iter()
            .rposition(|call| call.is_running() && call.name == name),
    }?;

    state.active_tool_calls.get_mut(idx)
}

#[cfg(test)]
mod tests;
