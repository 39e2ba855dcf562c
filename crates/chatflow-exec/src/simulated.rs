use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use chatflow_core::AgentStreamEvent;
use chrono::Utc;
use uuid::Uuid;

use crate::catalog::InMemorySessionCatalog;
use crate::catalog::MessageRecord;
use crate::channel::EventPublisher;
use crate::contracts::AgentBackend;
use crate::contracts::SendRequest;
use crate::error::ExecError;

pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const TITLE_CHARS: usize = 60;
const DEFAULT_FAILURE: &str = "simulated provider failure";

/// Scripted stand-in for the agent pipeline.
///
/// Every turn recalls memory, calls a pretend provider and streams an echo
/// of the message word by word. `/tool <name> [input]` runs one of the
/// built-in tools first; `/fail [reason]` ends the turn with an error.
pub struct SimulatedBackend {
    publisher: EventPublisher,
    catalog: Arc<InMemorySessionCatalog>,
    chunk_delay: Duration,
}

impl SimulatedBackend {
    pub fn new(publisher: EventPublisher, catalog: Arc<InMemorySessionCatalog>) -> Self {
        Self {
            publisher,
            catalog,
            chunk_delay: Duration::ZERO,
        }
    }

    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }
}

#[async_trait]
impl AgentBackend for SimulatedBackend {
    async fn send(&self, request: SendRequest) -> Result<String, ExecError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| ExecError::Transport(err.to_string()))?;
        let provider = request
            .provider
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let model = request.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let session_id = match request.session_id {
            Some(id) => id,
            None => self.catalog.create(&provider, &model).id,
        };

        let turn = ScriptedTurn {
            publisher: self.publisher.clone(),
            catalog: Arc::clone(&self.catalog),
            session_id: session_id.clone(),
            message: request.message,
            provider,
            model,
            chunk_delay: self.chunk_delay,
        };
        runtime.spawn(turn.run());

        Ok(session_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script<'a> {
    Reply,
    Tool { name: &'a str, input: &'a str },
    Fail(&'a str),
}

fn script(message: &str) -> Script<'_> {
    if let Some(rest) = message.strip_prefix("/tool ") {
        let rest = rest.trim();
        let (name, input) = rest.split_once(' ').unwrap_or((rest, ""));
        if !name.is_empty() {
            return Script::Tool {
                name,
                input: input.trim(),
            };
        }
    }
    if let Some(rest) = message.strip_prefix("/fail") {
        let reason = rest.trim();
        return Script::Fail(if reason.is_empty() {
            DEFAULT_FAILURE
        } else {
            reason
        });
    }
    Script::Reply
}

fn run_tool(name: &str, input: &str) -> (bool, String) {
    match name {
        "echo" => (true, input.to_string()),
        "time" => (true, Utc::now().to_rfc3339()),
        _ => (false, format!("Unknown tool: {name}")),
    }
}

/// Splits text into word chunks that concatenate back to the input.
fn word_chunks(text: &str) -> Vec<String> {
    text.split(' ')
        .enumerate()
        .map(|(idx, word)| {
            if idx == 0 {
                word.to_string()
            } else {
                format!(" {word}")
            }
        })
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

struct ScriptedTurn {
    publisher: EventPublisher,
    catalog: Arc<InMemorySessionCatalog>,
    session_id: String,
    message: String,
    provider: String,
    model: String,
    chunk_delay: Duration,
}

impl ScriptedTurn {
    async fn run(self) {
        if let Err(err) = self.play().await {
            tracing::warn!(session_id = %self.session_id, error = %err, "simulated turn failed");
            self.emit(AgentStreamEvent::error(err.to_string()));
        }
    }

    async fn play(&self) -> Result<(), ExecError> {
        let first_turn = self.catalog.summary(&self.session_id)?.message_count == 0;
        self.catalog
            .append_message(&self.session_id, MessageRecord::user(&self.message))?;

        self.emit(AgentStreamEvent::MemoryRecall {
            query: self.message.clone(),
            results_count: 0,
        });
        let started = Instant::now();
        self.emit(AgentStreamEvent::ProviderCallStart {
            provider: self.provider.clone(),
            model: self.model.clone(),
        });

        let reply = match script(&self.message) {
            Script::Fail(reason) => {
                self.emit(AgentStreamEvent::error(reason));
                return Ok(());
            }
            Script::Tool { name, input } => {
                let (success, output) = self.call_tool(name, input).await?;
                if success {
                    format!("The {name} tool returned: {output}")
                } else {
                    format!("The {name} tool failed: {output}")
                }
            }
            Script::Reply => format!("You said: {}", self.message),
        };

        for chunk in word_chunks(&reply) {
            self.pause().await;
            self.emit(AgentStreamEvent::text(chunk));
        }
        self.emit(AgentStreamEvent::ProviderCallEnd {
            duration_ms: started.elapsed().as_millis() as u64,
        });

        self.catalog
            .append_message(&self.session_id, MessageRecord::assistant(reply))?;
        if first_turn {
            let title: String = self.message.chars().take(TITLE_CHARS).collect();
            self.catalog.update_title(&self.session_id, &title)?;
        }

        self.emit(AgentStreamEvent::done(self.session_id.clone()));
        Ok(())
    }

    async fn call_tool(&self, name: &str, input: &str) -> Result<(bool, String), ExecError> {
        let call_id = Uuid::new_v4().to_string();
        let arguments = serde_json::json!({ "input": input }).to_string();

        self.emit(AgentStreamEvent::ToolCallStart {
            name: name.to_string(),
            arguments: arguments.clone(),
            call_id: Some(call_id.clone()),
        });
        self.catalog
            .append_message(&self.session_id, MessageRecord::tool_call(name, arguments))?;

        self.pause().await;
        let (success, output) = run_tool(name, input);

        self.emit(AgentStreamEvent::ToolCallResult {
            name: name.to_string(),
            success,
            output: output.clone(),
            call_id: Some(call_id),
        });
        self.catalog.append_message(
            &self.session_id,
            MessageRecord::tool_result(name, success, output.clone()),
        )?;
        Ok((success, output))
    }

    async fn pause(&self) {
        if !self.chunk_delay.is_zero() {
            tokio::time::sleep(self.chunk_delay).await;
        }
    }

    fn emit(&self, event: AgentStreamEvent) {
        if let Err(err) = self.publisher.publish(&event) {
            tracing::debug!(event = event.kind(), error = %err, "event not delivered");
        }
    }
}
