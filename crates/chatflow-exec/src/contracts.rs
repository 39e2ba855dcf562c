use async_trait::async_trait;
use chatflow_core::AgentStreamEvent;
use chatflow_core::ListRequest;
use chatflow_core::SessionDetail;
use chatflow_core::SessionSummary;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ExecError;

/// Outbound command for one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub session_id: Option<String>,
    pub message: String,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Starts an agent turn. Returns the session id the turn runs under; the
/// turn's progress arrives separately on the event channel.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn send(&self, request: SendRequest) -> Result<String, ExecError>;
}

pub type EventHandler = Box<dyn Fn(AgentStreamEvent) + Send + Sync>;

/// A named feed of agent stream events.
///
/// Implementations may still invoke a handler after its subscription was
/// released, so handlers must check their own liveness.
pub trait EventChannel: Send + Sync {
    fn subscribe(&self, handler: EventHandler) -> Result<Subscription, ExecError>;
}

/// Release handle for an event subscription.
///
/// `unsubscribe` consumes the handle, and dropping an unreleased handle
/// releases it, so the release hook runs exactly once.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Read side of the persisted session store.
#[async_trait]
pub trait SessionCatalog: Send + Sync {
    async fn list(&self, request: ListRequest) -> Result<Vec<SessionSummary>, ExecError>;
    async fn get(&self, session_id: &str) -> Result<SessionDetail, ExecError>;
    async fn delete(&self, session_id: &str) -> Result<(), ExecError>;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;

    fn counted() -> (Arc<AtomicUsize>, Subscription) {
        let released = Arc::new(AtomicUsize::new(0));
        let hook = Arc::clone(&released);
        let subscription = Subscription::new(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        });
        (released, subscription)
    }

    #[test]
    fn unsubscribe_releases_once() {
        let (released, subscription) = counted();
        subscription.unsubscribe();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_unreleased_handle_releases() {
        let (released, subscription) = counted();
        drop(subscription);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
