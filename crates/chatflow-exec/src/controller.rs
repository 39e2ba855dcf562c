use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use chatflow_core::config::Config;
use chatflow_core::reduce;
use chatflow_core::ChatAction;
use chatflow_core::ChatEffect;
use chatflow_core::ChatSnapshot;
use chatflow_core::ChatState;
use chatflow_core::ListRequest;
use chatflow_core::RuntimeAction;
use chatflow_core::SessionDetail;
use chatflow_core::SessionId;
use chatflow_core::SessionSummary;
use chatflow_core::UserAction;
use chatflow_core::DEFAULT_LIST_LIMIT;
use tokio::sync::watch;

use crate::contracts::AgentBackend;
use crate::contracts::EventChannel;
use crate::contracts::EventHandler;
use crate::contracts::SendRequest;
use crate::contracts::SessionCatalog;
use crate::contracts::Subscription;
use crate::error::ExecError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub list_limit: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider: config.model.default_provider.clone(),
            model: config.model.default_model.clone(),
            list_limit: config.catalog.list_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, or a turn was already in flight.
    Ignored,
    Accepted(String),
    Failed(String),
}

struct PendingSend {
    generation: u64,
    session_id: Option<SessionId>,
    message: String,
}

struct Shared {
    state: Mutex<ChatState>,
    // Generation whose subscription may still deliver. Checked before the
    // reducer sees an event.
    live_generation: AtomicU64,
    subscription: Mutex<Option<Subscription>>,
    frames: watch::Sender<ChatSnapshot>,
    sessions: watch::Sender<Vec<SessionSummary>>,
    backend: Arc<dyn AgentBackend>,
    channel: Arc<dyn EventChannel>,
    catalog: Arc<dyn SessionCatalog>,
    settings: ControllerSettings,
}

/// Owns the chat state for one session and executes the reducer's effects.
///
/// Every mutation goes through [`reduce`] under a single lock. Render
/// snapshots are published on a watch channel after each state change.
#[derive(Clone)]
pub struct ChatController {
    inner: Arc<Shared>,
}

impl ChatController {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        channel: Arc<dyn EventChannel>,
        catalog: Arc<dyn SessionCatalog>,
        settings: ControllerSettings,
    ) -> Self {
        let (frames, _) = watch::channel(ChatSnapshot::default());
        let (sessions, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(ChatState::new()),
                live_generation: AtomicU64::new(0),
                subscription: Mutex::new(None),
                frames,
                sessions,
                backend,
                channel,
                catalog,
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.inner.settings
    }

    /// Opens the event subscription and loads the session listing.
    pub fn start(&self) {
        let generation = self.lock_state().generation;
        self.resubscribe(generation);
        self.spawn_reload();
    }

    /// Releases the event subscription. Events still in flight are dropped.
    pub fn shutdown(&self) {
        self.inner.live_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(subscription) = lock(&self.inner.subscription).take() {
            subscription.unsubscribe();
        }
    }

    pub async fn send_message(&self, content: impl Into<String>) -> SendOutcome {
        let Some(pending) = self.dispatch(ChatAction::send(content)) else {
            return SendOutcome::Ignored;
        };

        let request = SendRequest {
            session_id: pending.session_id.map(|id| id.to_string()),
            message: pending.message,
            provider: self.inner.settings.provider.clone(),
            model: self.inner.settings.model.clone(),
        };
        let generation = pending.generation;

        match self.inner.backend.send(request).await {
            Ok(session_id) => {
                tracing::debug!(%session_id, generation, "send accepted");
                self.dispatch(ChatAction::Runtime(RuntimeAction::SendAccepted {
                    generation,
                    session_id: session_id.clone(),
                }));
                SendOutcome::Accepted(session_id)
            }
            Err(err) => {
                let error = err.to_string();
                tracing::warn!(%error, generation, "send failed");
                self.dispatch(ChatAction::Runtime(RuntimeAction::SendFailed {
                    generation,
                    error: error.clone(),
                }));
                SendOutcome::Failed(error)
            }
        }
    }

    pub fn new_session(&self) {
        self.dispatch(ChatAction::User(UserAction::NewSession));
    }

    pub fn continue_session(&self, detail: SessionDetail) {
        self.dispatch(ChatAction::User(UserAction::ContinueSession(detail)));
    }

    /// Fetches a persisted session and continues it. State is untouched when
    /// the fetch fails.
    pub async fn continue_from_catalog(&self, session_id: &str) -> Result<(), ExecError> {
        let detail = self.inner.catalog.get(session_id).await?;
        tracing::info!(session_id, messages = detail.messages.len(), "continuing session");
        self.continue_session(detail);
        Ok(())
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.lock_state().snapshot()
    }

    pub fn watch(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.frames.subscribe()
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.inner.sessions.borrow().clone()
    }

    pub fn watch_sessions(&self) -> watch::Receiver<Vec<SessionSummary>> {
        self.inner.sessions.subscribe()
    }

    pub async fn reload_sessions(&self) -> Result<Vec<SessionSummary>, ExecError> {
        let sessions = self
            .inner
            .catalog
            .list(ListRequest {
                limit: self.inner.settings.list_limit,
                offset: 0,
            })
            .await?;
        self.inner.sessions.send_replace(sessions.clone());
        Ok(sessions)
    }

    /// Deletes a persisted session. The active conversation is not touched,
    /// even when it is the one deleted.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ExecError> {
        self.inner.catalog.delete(session_id).await?;
        self.inner
            .sessions
            .send_modify(|sessions| sessions.retain(|summary| summary.id != session_id));
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, ChatState> {
        lock(&self.inner.state)
    }

    fn dispatch(&self, action: ChatAction) -> Option<PendingSend> {
        let effects = {
            let mut state = self.lock_state();
            reduce(&mut state, action)
        };

        let mut pending = None;
        for effect in effects {
            match effect {
                ChatEffect::SubmitMessage {
                    generation,
                    session_id,
                    message,
                } => {
                    pending = Some(PendingSend {
                        generation,
                        session_id,
                        message,
                    });
                }
                ChatEffect::Resubscribe { generation } => self.resubscribe(generation),
                ChatEffect::ReloadSessions => self.spawn_reload(),
                ChatEffect::RequestFrame => self.publish_frame(),
            }
        }
        pending
    }

    fn publish_frame(&self) {
        let snapshot = self.snapshot();
        self.inner.frames.send_replace(snapshot);
    }

    fn resubscribe(&self, generation: u64) {
        self.inner
            .live_generation
            .store(generation, Ordering::SeqCst);

        let mut slot = lock(&self.inner.subscription);
        if let Some(previous) = slot.take() {
            previous.unsubscribe();
        }
        match self.inner.channel.subscribe(self.event_handler(generation)) {
            Ok(subscription) => {
                tracing::debug!(generation, "event subscription opened");
                *slot = Some(subscription);
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "failed to subscribe to agent events");
            }
        }
    }

    fn event_handler(&self, generation: u64) -> EventHandler {
        let shared = Arc::downgrade(&self.inner);
        Box::new(move |event| {
            let Some(inner) = shared.upgrade() else {
                return;
            };
            if inner.live_generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(
                    event = event.kind(),
                    generation,
                    "dropping event delivered after unsubscribe"
                );
                return;
            }
            let received_at_ms = chrono::Utc::now().timestamp_millis();
            ChatController { inner }.dispatch(ChatAction::stream(generation, received_at_ms, event));
        })
    }

    fn spawn_reload(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime; session list not reloaded");
            return;
        };
        let controller = self.clone();
        runtime.spawn(async move {
            if let Err(err) = controller.reload_sessions().await {
                tracing::warn!(error = %err, "failed to reload sessions");
            }
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
