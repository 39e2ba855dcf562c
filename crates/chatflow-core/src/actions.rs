use super::catalog::SessionDetail;
use super::events::AgentStreamEvent;

#[derive(Debug, Clone)]
pub enum ChatAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    SendMessage { content: String },
    NewSession,
    ContinueSession(SessionDetail),
}

#[derive(Debug, Clone)]
pub enum RuntimeAction {
    /// One event from the agent stream, tagged with the generation of the
    /// subscription that delivered it.
    StreamEvent {
        generation: u64,
        received_at_ms: i64,
        event: AgentStreamEvent,
    },
    /// The outbound send returned a session id.
    SendAccepted { generation: u64, session_id: String },
    /// The outbound send never reached the backend.
    SendFailed { generation: u64, error: String },
}

impl ChatAction {
    pub fn send(content: impl Into<String>) -> Self {
        Self::User(UserAction::SendMessage {
            content: content.into(),
        })
    }

    pub fn stream(generation: u64, received_at_ms: i64, event: AgentStreamEvent) -> Self {
        Self::Runtime(RuntimeAction::StreamEvent {
            generation,
            received_at_ms,
            event,
        })
    }
}
