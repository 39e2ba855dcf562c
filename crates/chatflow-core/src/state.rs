use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Arc<str>);

impl SessionId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

impl ChatRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool_call" => Some(Self::ToolCall),
            "tool_result" => Some(Self::ToolResult),
            _ => None,
        }
    }

    pub fn is_tool(self) -> bool {
        matches!(self, Self::ToolCall | Self::ToolResult)
    }
}

/// One committed transcript entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_success: Option<bool>,
}

impl ChatMessage {
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self::plain(id, ChatRole::User, content)
    }

    pub fn assistant(id: MessageId, content: impl Into<String>) -> Self {
        Self::plain(id, ChatRole::Assistant, content)
    }

    fn plain(id: MessageId, role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            tool_name: None,
            tool_args: None,
            tool_success: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Running,
    Success,
    Error,
}

impl ToolCallStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Error
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub name: String,
    pub arguments: String,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ToolCallActivity {
    pub fn is_running(&self) -> bool {
        self.status == ToolCallStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Memory,
    Provider,
    Tool,
}

impl ActivityKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Provider => "provider",
            Self::Tool => "tool",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Self::Memory => "mem",
            Self::Provider => "prov",
            Self::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub label: String,
    pub kind: ActivityKind,
    pub timestamp_ms: i64,
}

/// Ephemeral progress notes for the turn in flight.
///
/// Sequence numbers keep counting across `clear` so ids stay unique for the
/// lifetime of the session state.
#[derive(Debug, Clone, Default)]
pub struct ActivityFeed {
    next_seq: u64,
    items: Vec<Activity>,
}

impl ActivityFeed {
    pub fn push(&mut self, kind: ActivityKind, label: String, timestamp_ms: i64) {
        let id = format!("{}-{}", kind.id_prefix(), self.next_seq);
        self.next_seq += 1;
        self.items.push(Activity {
            id,
            label,
            kind,
            timestamp_ms,
        });
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Activity] {
        &self.items
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Streaming,
}

impl TurnPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub transcript: Vec<ChatMessage>,
    pub streaming_text: String,
    pub active_tool_calls: Vec<ToolCallActivity>,
    pub activities: ActivityFeed,
    pub phase: TurnPhase,
    pub session_id: Option<SessionId>,
    pub next_message_seq: u64,
    /// Bumped whenever the session is replaced; work tagged with an older
    /// generation belongs to a superseded session.
    pub generation: u64,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generation(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == TurnPhase::Streaming
    }

    pub fn next_message_id(&mut self) -> MessageId {
        let id = MessageId(self.next_message_seq);
        self.next_message_seq += 1;
        id
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        let id = self.next_message_id();
        self.transcript.push(ChatMessage::user(id, content));
        id
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> MessageId {
        let id = self.next_message_id();
        self.transcript.push(ChatMessage::assistant(id, content));
        id
    }

    /// Drops everything scoped to the turn in flight.
    pub fn clear_turn(&mut self) {
        self.streaming_text.clear();
        self.active_tool_calls.clear();
        self.activities.clear();
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.transcript.clone(),
            streaming_content: self.streaming_text.clone(),
            active_tool_calls: self.active_tool_calls.clone(),
            activities: self.activities.as_slice().to_vec(),
            is_streaming: self.is_streaming(),
            session_id: self.session_id.clone(),
        }
    }
}

/// Render-ready copy of the session state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub streaming_content: String,
    pub active_tool_calls: Vec<ToolCallActivity>,
    pub activities: Vec<Activity>,
    pub is_streaming: bool,
    pub session_id: Option<SessionId>,
}
