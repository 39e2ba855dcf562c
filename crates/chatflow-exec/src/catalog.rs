use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use async_trait::async_trait;
use chatflow_core::ChatRole;
use chatflow_core::ListRequest;
use chatflow_core::SessionDetail;
use chatflow_core::SessionMessage;
use chatflow_core::SessionSummary;
use chrono::SecondsFormat;
use chrono::Utc;
use uuid::Uuid;

use crate::contracts::SessionCatalog;
use crate::error::ExecError;

pub const DEFAULT_SESSION_TITLE: &str = "New Session";

/// A message to persist, before the catalog assigns id, timestamp and
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub role: ChatRole,
    pub content: String,
    pub tool_name: Option<String>,
    pub tool_args: Option<String>,
    pub tool_success: Option<bool>,
}

impl MessageRecord {
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::Assistant, content)
    }

    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            role: ChatRole::ToolCall,
            content: name.clone(),
            tool_name: Some(name),
            tool_args: Some(arguments.into()),
            tool_success: None,
        }
    }

    pub fn tool_result(name: impl Into<String>, success: bool, output: impl Into<String>) -> Self {
        Self {
            role: ChatRole::ToolResult,
            content: output.into(),
            tool_name: Some(name.into()),
            tool_args: None,
            tool_success: Some(success),
        }
    }

    fn plain(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_name: None,
            tool_args: None,
            tool_success: None,
        }
    }
}

#[derive(Debug)]
struct StoredSession {
    summary: SessionSummary,
    messages: Vec<SessionMessage>,
    // Tie-breaker for sessions touched within the same timestamp tick.
    touched: u64,
}

#[derive(Debug, Default)]
struct CatalogStore {
    sessions: HashMap<String, StoredSession>,
    clock: u64,
}

impl CatalogStore {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut StoredSession, ExecError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| ExecError::SessionNotFound(session_id.to_string()))
    }
}

/// Session store kept in process memory. Backs the simulated backend and
/// tests; nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemorySessionCatalog {
    store: Mutex<CatalogStore>,
}

impl InMemorySessionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CatalogStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, provider: &str, model: &str) -> SessionSummary {
        let now = timestamp();
        let summary = SessionSummary {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            created_at: now.clone(),
            updated_at: now,
            message_count: 0,
        };

        let mut store = self.lock();
        let touched = store.tick();
        store.sessions.insert(
            summary.id.clone(),
            StoredSession {
                summary: summary.clone(),
                messages: Vec::new(),
                touched,
            },
        );
        tracing::debug!(session_id = %summary.id, provider, model, "session created");
        summary
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().sessions.contains_key(session_id)
    }

    pub fn summary(&self, session_id: &str) -> Result<SessionSummary, ExecError> {
        let mut store = self.lock();
        Ok(store.session_mut(session_id)?.summary.clone())
    }

    /// Appends a message and returns its id. Sequences start at 1.
    pub fn append_message(
        &self,
        session_id: &str,
        record: MessageRecord,
    ) -> Result<String, ExecError> {
        let mut store = self.lock();
        let touched = store.tick();
        let session = store.session_mut(session_id)?;
        let now = timestamp();
        let sequence = session
            .messages
            .last()
            .map_or(1, |message| message.sequence + 1);
        let id = Uuid::new_v4().to_string();

        session.messages.push(SessionMessage {
            id: id.clone(),
            session_id: session_id.to_string(),
            role: record.role.label().to_string(),
            content: record.content,
            tool_name: record.tool_name,
            tool_args: record.tool_args,
            tool_success: record.tool_success,
            timestamp: now.clone(),
            sequence,
        });
        session.summary.message_count += 1;
        session.summary.updated_at = now;
        session.touched = touched;
        Ok(id)
    }

    pub fn update_title(&self, session_id: &str, title: &str) -> Result<(), ExecError> {
        let mut store = self.lock();
        let session = store.session_mut(session_id)?;
        session.summary.title = title.to_string();
        Ok(())
    }
}

#[async_trait]
impl SessionCatalog for InMemorySessionCatalog {
    async fn list(&self, request: ListRequest) -> Result<Vec<SessionSummary>, ExecError> {
        let store = self.lock();
        let mut sessions: Vec<&StoredSession> = store.sessions.values().collect();
        sessions.sort_by(|a, b| {
            b.summary
                .updated_at
                .cmp(&a.summary.updated_at)
                .then(b.touched.cmp(&a.touched))
        });

        Ok(sessions
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|session| session.summary.clone())
            .collect())
    }

    async fn get(&self, session_id: &str) -> Result<SessionDetail, ExecError> {
        let store = self.lock();
        let session = store
            .sessions
            .get(session_id)
            .ok_or_else(|| ExecError::SessionNotFound(session_id.to_string()))?;

        let mut messages = session.messages.clone();
        messages.sort_by_key(|message| message.sequence);
        Ok(SessionDetail {
            summary: session.summary.clone(),
            messages,
        })
    }

    async fn delete(&self, session_id: &str) -> Result<(), ExecError> {
        let removed = self.lock().sessions.remove(session_id);
        if removed.is_none() {
            tracing::debug!(session_id, "delete of unknown session");
        }
        Ok(())
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
