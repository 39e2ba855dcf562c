use std::sync::Arc;

use chatflow_core::config::StreamConfig;
use chatflow_core::AgentStreamEvent;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::contracts::EventChannel;
use crate::contracts::EventHandler;
use crate::contracts::Subscription;
use crate::error::ExecError;

/// In-process event feed. Payloads travel as raw JSON and are decoded per
/// subscriber, so a malformed payload is dropped at the receiving edge.
#[derive(Debug, Clone)]
pub struct BroadcastEventChannel {
    name: Arc<str>,
    tx: broadcast::Sender<Value>,
}

impl BroadcastEventChannel {
    pub fn new(name: impl Into<Arc<str>>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            tx,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.channel.as_str(), config.capacity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventChannel for BroadcastEventChannel {
    fn subscribe(&self, handler: EventHandler) -> Result<Subscription, ExecError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| ExecError::Transport(err.to_string()))?;
        let mut rx = self.tx.subscribe();
        let name = Arc::clone(&self.name);

        tracing::debug!(channel = %name, "subscribing");
        let task = runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => {
                        if let Some(event) = decode_event(&name, payload) {
                            handler(event);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %name, skipped, "subscriber lagged; events lost");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!(channel = %name, "event feed closed");
        });

        let name = Arc::clone(&self.name);
        Ok(Subscription::new(move || {
            tracing::debug!(channel = %name, "unsubscribing");
            task.abort();
        }))
    }
}

/// Sending half of a [`BroadcastEventChannel`].
#[derive(Debug, Clone)]
pub struct EventPublisher {
    name: Arc<str>,
    tx: broadcast::Sender<Value>,
}

impl EventPublisher {
    /// Publishes a typed event. Returns the number of subscribers reached.
    pub fn publish(&self, event: &AgentStreamEvent) -> Result<usize, ExecError> {
        let payload =
            serde_json::to_value(event).map_err(|err| ExecError::Transport(err.to_string()))?;
        self.publish_raw(payload)
    }

    /// Publishes an untyped payload as it would arrive from a foreign
    /// emitter.
    pub fn publish_raw(&self, payload: Value) -> Result<usize, ExecError> {
        self.tx.send(payload).map_err(|_| {
            tracing::debug!(channel = %self.name, "no live subscriber");
            ExecError::ChannelClosed
        })
    }
}

fn decode_event(channel: &str, payload: Value) -> Option<AgentStreamEvent> {
    match serde_json::from_value::<AgentStreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(channel, error = %err, "dropping malformed stream event");
            None
        }
    }
}
