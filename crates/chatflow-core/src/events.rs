use serde::Deserialize;
use serde::Serialize;

/// Events published by the agent backend for one turn.
///
/// All events of a turn arrive before that turn's terminal event
/// (`Done` or `Error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentStreamEvent {
    /// A chunk of assistant text.
    TextChunk { content: String },
    /// A tool call has started executing.
    ToolCallStart {
        name: String,
        arguments: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
    },
    /// A tool call has finished.
    ToolCallResult {
        name: String,
        success: bool,
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
    },
    /// Memory was searched for context.
    MemoryRecall { query: String, results_count: usize },
    /// A provider call has started.
    ProviderCallStart { provider: String, model: String },
    /// A provider call has ended.
    ProviderCallEnd { duration_ms: u64 },
    /// The turn completed.
    Done { session_id: String },
    /// The backend gave up on the turn.
    Error { message: String },
}

impl AgentStreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TextChunk { .. } => "TextChunk",
            Self::ToolCallStart { .. } => "ToolCallStart",
            Self::ToolCallResult { .. } => "ToolCallResult",
            Self::MemoryRecall { .. } => "MemoryRecall",
            Self::ProviderCallStart { .. } => "ProviderCallStart",
            Self::ProviderCallEnd { .. } => "ProviderCallEnd",
            Self::Done { .. } => "Done",
            Self::Error { .. } => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::TextChunk {
            content: content.into(),
        }
    }

    pub fn tool_start(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::ToolCallStart {
            name: name.into(),
            arguments: arguments.into(),
            call_id: None,
        }
    }

    pub fn tool_result(name: impl Into<String>, success: bool, output: impl Into<String>) -> Self {
        Self::ToolCallResult {
            name: name.into(),
            success,
            output: output.into(),
            call_id: None,
        }
    }

    pub fn done(session_id: impl Into<String>) -> Self {
        Self::Done {
            session_id: session_id.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::AgentStreamEvent;

    #[test]
    fn decodes_internally_tagged_payloads() {
        let event: AgentStreamEvent = serde_json::from_value(json!({
            "type": "ToolCallResult",
            "name": "search",
            "success": true,
            "output": "3 hits",
        }))
        .expect("decode");

        assert_eq!(event, AgentStreamEvent::tool_result("search", true, "3 hits"));
    }

    #[test]
    fn call_id_is_optional_and_omitted_when_absent() {
        let encoded = serde_json::to_value(AgentStreamEvent::tool_start("search", "{}"))
            .expect("encode");
        assert_eq!(
            encoded,
            json!({"type": "ToolCallStart", "name": "search", "arguments": "{}"})
        );

        let with_id: AgentStreamEvent = serde_json::from_value(json!({
            "type": "ToolCallStart",
            "name": "search",
            "arguments": "{}",
            "call_id": "c-1",
        }))
        .expect("decode");
        assert!(matches!(
            with_id,
            AgentStreamEvent::ToolCallStart { call_id: Some(ref id), .. } if id == "c-1"
        ));
    }

    #[test]
    fn unknown_discriminant_fails_to_decode() {
        let result =
            serde_json::from_value::<AgentStreamEvent>(json!({"type": "Heartbeat"}));
        assert!(result.is_err());
    }

    #[test]
    fn only_done_and_error_are_terminal() {
        assert!(AgentStreamEvent::done("s1").is_terminal());
        assert!(AgentStreamEvent::error("boom").is_terminal());
        assert!(!AgentStreamEvent::text("hi").is_terminal());
        assert!(!AgentStreamEvent::ProviderCallEnd { duration_ms: 5 }.is_terminal());
    }
}
