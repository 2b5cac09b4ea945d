use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use shared::domain::PresenterId;

/// Callback registered for one topic. Receives the payload by shared read
/// access; it must not assume exclusive ownership.
pub type Handler = Arc<dyn Fn(Arc<Value>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Outcome of a conventional dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Unhandled,
}

/// A coordinating unit that resolves topics to its own handlers by naming
/// convention, the counterpart of `EventBus::subscribe`.
#[async_trait]
pub trait TopicSubscriber: Send + Sync {
    fn presenter_id(&self) -> PresenterId;

    /// Route `topic` to the matching handler. Returning
    /// [`Dispatch::Unhandled`] is not an error; the bus logs it and moves
    /// on.
    async fn dispatch(&self, topic: &str, payload: Arc<Value>) -> Result<Dispatch>;
}

#[derive(Clone)]
enum Callback {
    Explicit(Handler),
    Conventional(Weak<dyn TopicSubscriber>),
}

#[derive(Clone)]
struct Subscription {
    presenter_id: PresenterId,
    callback: Callback,
}

/// Process-wide multicast router from topic names to ordered subscriber
/// lists. The bus holds no business state; constructed once by the shell
/// and passed into every presenter.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<HashMap<String, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an explicit handler for `topic` on behalf of a presenter.
    pub async fn on(&self, presenter_id: PresenterId, topic: &str, handler: Handler) {
        self.register(
            topic,
            Subscription {
                presenter_id,
                callback: Callback::Explicit(handler),
            },
        )
        .await;
    }

    /// Register a subscriber whose conventionally-named handler is resolved
    /// at dispatch time. The subscriber is held weakly; a dropped presenter
    /// is skipped and pruned on the next `detach`.
    pub async fn subscribe(&self, topic: &str, subscriber: &Arc<dyn TopicSubscriber>) {
        self.register(
            topic,
            Subscription {
                presenter_id: subscriber.presenter_id(),
                callback: Callback::Conventional(Arc::downgrade(subscriber)),
            },
        )
        .await;
    }

    /// Drop every subscription owned by `presenter_id`. Called when the
    /// surface hosting the presenter closes.
    pub async fn detach(&self, presenter_id: PresenterId) {
        let mut registry = self.registry.lock().await;
        for subscriptions in registry.values_mut() {
            subscriptions.retain(|subscription| subscription.presenter_id != presenter_id);
        }
        registry.retain(|_, subscriptions| !subscriptions.is_empty());
    }

    /// Invoke every handler registered for `topic` in registration order,
    /// each awaited to completion before the next begins. A failing handler
    /// is logged and never aborts its siblings or the publisher. Publishing
    /// to a topic nobody subscribed to is a no-op.
    pub async fn trigger<T: Serialize + Sync>(&self, topic: &str, payload: &T) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => Arc::new(value),
            Err(err) => {
                warn!(topic, "failed to encode event payload: {err}");
                return;
            }
        };

        // Snapshot so handlers may subscribe or detach mid-dispatch without
        // affecting this call.
        let snapshot = {
            let registry = self.registry.lock().await;
            registry.get(topic).cloned().unwrap_or_default()
        };

        if snapshot.is_empty() {
            debug!(topic, "no subscribers for topic");
            return;
        }

        for subscription in snapshot {
            match &subscription.callback {
                Callback::Explicit(handler) => {
                    if let Err(err) = handler(Arc::clone(&payload)).await {
                        warn!(
                            topic,
                            presenter_id = %subscription.presenter_id,
                            "event handler failed: {err:#}"
                        );
                    }
                }
                Callback::Conventional(weak) => {
                    let Some(subscriber) = weak.upgrade() else {
                        continue;
                    };
                    match subscriber.dispatch(topic, Arc::clone(&payload)).await {
                        Ok(Dispatch::Handled) => {}
                        Ok(Dispatch::Unhandled) => warn!(
                            topic,
                            presenter_id = %subscription.presenter_id,
                            "subscriber has no handler for topic"
                        ),
                        Err(err) => warn!(
                            topic,
                            presenter_id = %subscription.presenter_id,
                            "subscriber handler failed: {err:#}"
                        ),
                    }
                }
            }
        }
    }

    async fn register(&self, topic: &str, subscription: Subscription) {
        self.registry
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(subscription);
    }
}

/// Decode a bus payload into the typed struct a handler expects.
pub fn decode_payload<T: DeserializeOwned>(payload: &Value) -> Result<T> {
    serde_json::from_value(payload.clone()).context("malformed event payload")
}

/// Shared capability every coordinating unit embeds: a unique identity, a
/// role name used for topic expansion, and a handle to the process-wide
/// bus. Composition, not inheritance.
#[derive(Clone)]
pub struct Presenter {
    id: PresenterId,
    name: String,
    bus: Arc<EventBus>,
}

impl Presenter {
    pub fn new(name: impl Into<String>, bus: Arc<EventBus>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bus,
        }
    }

    pub fn id(&self) -> PresenterId {
        self.id
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Expand the namespace shorthand: `V#X` → `{name}View#X`, `C#X` →
    /// `{name}Controller#X`, `#X` → `{name}Presenter#X`. Fully qualified
    /// topics pass through unchanged.
    pub fn expand_topic(&self, topic: &str) -> String {
        if let Some(rest) = topic.strip_prefix("V#") {
            format!("{}View#{rest}", self.name)
        } else if let Some(rest) = topic.strip_prefix("C#") {
            format!("{}Controller#{rest}", self.name)
        } else if let Some(rest) = topic.strip_prefix('#') {
            format!("{}Presenter#{rest}", self.name)
        } else {
            topic.to_string()
        }
    }

    pub async fn on(&self, topic: &str, handler: Handler) {
        self.bus.on(self.id, &self.expand_topic(topic), handler).await;
    }

    pub async fn subscribe(&self, topic: &str, subscriber: &Arc<dyn TopicSubscriber>) {
        self.bus
            .subscribe(&self.expand_topic(topic), subscriber)
            .await;
    }

    pub async fn trigger<T: Serialize + Sync>(&self, topic: &str, payload: &T) {
        self.bus.trigger(&self.expand_topic(topic), payload).await;
    }
}

#[cfg(test)]
#[path = "tests/event_bus_tests.rs"]
mod tests;
