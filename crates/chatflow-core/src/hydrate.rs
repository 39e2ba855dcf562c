use super::catalog::SessionDetail;
use super::catalog::SessionMessage;
use super::state::ChatMessage;
use super::state::ChatRole;
use super::state::ChatState;
use super::state::MessageId;
use super::state::SessionId;
use super::state::TurnPhase;

/// Replaces the session state with a persisted conversation.
///
/// Local ids are re-minted from zero and the counter continues after the
/// last hydrated message. The generation is left to the caller.
pub fn hydrate(state: &mut ChatState, detail: SessionDetail) {
    let SessionDetail { summary, messages } = detail;

    state.transcript = messages
        .into_iter()
        .enumerate()
        .map(|(idx, message)| message_from_persisted(MessageId(idx as u64), message))
        .collect();
    state.next_message_seq = state.transcript.len() as u64;
    state.session_id = Some(SessionId::new(summary.id));
    state.clear_turn();
    state.phase = TurnPhase::Idle;
}

fn message_from_persisted(id: MessageId, message: SessionMessage) -> ChatMessage {
    let role = ChatRole::parse(&message.role).unwrap_or_else(|| {
        tracing::warn!(
            role = %message.role,
            message_id = %message.id,
            "unknown persisted role; showing as assistant"
        );
        ChatRole::Assistant
    });

    ChatMessage {
        id,
        role,
        content: message.content,
        tool_name: message.tool_name,
        tool_args: message.tool_args,
        tool_success: message.tool_success,
    }
}
