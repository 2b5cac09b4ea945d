use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

/// Side effect attached to one key; runs with the incoming value before the
/// commit.
pub type WriteHook = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Keyed value container whose writes carry registered side effects, so a
/// writer cannot forget to notify the collaborator watching a key.
///
/// The hook fires on every write, including writes of an unchanged value,
/// and the new value is committed unconditionally afterwards; a failing
/// hook is logged and never blocks the commit.
#[derive(Default)]
pub struct ReactiveStore {
    values: Mutex<HashMap<String, Value>>,
    hooks: Mutex<HashMap<String, WriteHook>>,
}

impl ReactiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an initial value without running any hook.
    pub async fn seed(&self, key: &str, value: &(impl Serialize + Sync)) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, "failed to encode seeded value: {err}");
                return;
            }
        };
        self.values.lock().await.insert(key.to_string(), value);
    }

    /// Register the on-write side effect for `key`, replacing any previous
    /// hook.
    pub async fn on_write(&self, key: &str, hook: WriteHook) {
        self.hooks.lock().await.insert(key.to_string(), hook);
    }

    pub async fn set(&self, key: &str, value: &(impl Serialize + Sync)) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, "failed to encode value: {err}");
                return;
            }
        };

        let hook = self.hooks.lock().await.get(key).cloned();
        if let Some(hook) = hook {
            if let Err(err) = hook(value.clone()).await {
                warn!(key, "write hook failed: {err:#}");
            }
        }

        self.values.lock().await.insert(key.to_string(), value);
    }

    /// The last committed value, or `Value::Null` for a key never seeded or
    /// written.
    pub async fn get(&self, key: &str) -> Value {
        self.values
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
#[path = "tests/reactive_tests.rs"]
mod tests;
