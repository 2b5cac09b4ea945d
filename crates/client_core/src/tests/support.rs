use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Notify;
use uuid::Uuid;

use shared::{domain::BugId, error::BugError, protocol::{BugPayload, BugRecord}};

use crate::{
    BugEditor, BugStore, EventBus, FieldSelection, RemoteTracker, Router, SubscriptionChange,
};

/// Collects every payload published on the watched topics, in order.
pub(crate) struct EventLog {
    events: Arc<StdMutex<Vec<(String, Value)>>>,
}

impl EventLog {
    pub(crate) async fn attach(bus: &Arc<EventBus>, topics: &[&str]) -> Self {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let presenter_id = Uuid::new_v4();
        for &topic in topics {
            let sink = Arc::clone(&events);
            let name = topic.to_string();
            bus.on(
                presenter_id,
                topic,
                Arc::new(move |payload| {
                    let sink = Arc::clone(&sink);
                    let name = name.clone();
                    Box::pin(async move {
                        sink.lock().expect("event log").push((name, (*payload).clone()));
                        Ok(())
                    })
                }),
            )
            .await;
        }
        Self { events }
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("event log")
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub(crate) fn payload_for(&self, topic: &str) -> Option<Value> {
        self.events
            .lock()
            .expect("event log")
            .iter()
            .find(|(name, _)| name == topic)
            .map(|(_, payload)| payload.clone())
    }

    pub(crate) fn count(&self, topic: &str) -> usize {
        self.events
            .lock()
            .expect("event log")
            .iter()
            .filter(|(name, _)| name == topic)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().expect("event log").len()
    }
}

pub(crate) fn usable_record(id: i64, summary: &str) -> BugRecord {
    let mut payload = BugPayload::empty(BugId(id));
    payload.summary = Some(summary.to_string());
    BugRecord {
        bug_id: BugId(id),
        data: Some(payload),
        error: None,
        fetched_at: Utc::now(),
    }
}

pub(crate) fn record_without_summary(id: i64) -> BugRecord {
    BugRecord {
        bug_id: BugId(id),
        data: Some(BugPayload::empty(BugId(id))),
        error: None,
        fetched_at: Utc::now(),
    }
}

pub(crate) fn errored_record(id: i64, code: i64, message: &str) -> BugRecord {
    BugRecord {
        bug_id: BugId(id),
        data: None,
        error: Some(BugError::new(code, message)),
        fetched_at: Utc::now(),
    }
}

pub(crate) struct InMemoryBugStore {
    records: StdMutex<HashMap<i64, BugRecord>>,
    fail_saves: bool,
}

impl InMemoryBugStore {
    pub(crate) fn empty() -> Arc<Self> {
        Arc::new(Self {
            records: StdMutex::new(HashMap::new()),
            fail_saves: false,
        })
    }

    pub(crate) fn with_record(record: BugRecord) -> Arc<Self> {
        let store = Self::empty();
        store
            .records
            .lock()
            .expect("records")
            .insert(record.bug_id.0, record);
        store
    }

    pub(crate) fn failing_saves() -> Arc<Self> {
        Arc::new(Self {
            records: StdMutex::new(HashMap::new()),
            fail_saves: true,
        })
    }

    pub(crate) fn saved(&self, id: i64) -> Option<BugRecord> {
        self.records.lock().expect("records").get(&id).cloned()
    }
}

#[async_trait]
impl BugStore for InMemoryBugStore {
    async fn get(&self, bug_id: BugId) -> Result<Option<BugRecord>> {
        Ok(self.records.lock().expect("records").get(&bug_id.0).cloned())
    }

    async fn save(&self, record: &BugRecord) -> Result<()> {
        if self.fail_saves {
            return Err(anyhow!("disk full"));
        }
        self.records
            .lock()
            .expect("records")
            .insert(record.bug_id.0, record.clone());
        Ok(())
    }
}

/// Store whose `get` parks until released, to hold a load at its first
/// suspension point.
pub(crate) struct GatedBugStore {
    pub(crate) entered: Notify,
    pub(crate) release: Notify,
}

impl GatedBugStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl BugStore for GatedBugStore {
    async fn get(&self, _bug_id: BugId) -> Result<Option<BugRecord>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(None)
    }

    async fn save(&self, _record: &BugRecord) -> Result<()> {
        Ok(())
    }
}

enum RemoteScript {
    Record(BugRecord),
    Failure(String),
}

pub(crate) struct ScriptedRemote {
    script: RemoteScript,
    calls: StdMutex<u32>,
}

impl ScriptedRemote {
    pub(crate) fn record(record: BugRecord) -> Arc<Self> {
        Arc::new(Self {
            script: RemoteScript::Record(record),
            calls: StdMutex::new(0),
        })
    }

    pub(crate) fn failure(message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: RemoteScript::Failure(message.to_string()),
            calls: StdMutex::new(0),
        })
    }

    pub(crate) fn calls(&self) -> u32 {
        *self.calls.lock().expect("calls")
    }
}

#[async_trait]
impl RemoteTracker for ScriptedRemote {
    async fn fetch_bug(&self, _bug_id: BugId, _selection: &FieldSelection) -> Result<BugRecord> {
        *self.calls.lock().expect("calls") += 1;
        match &self.script {
            RemoteScript::Record(record) => Ok(record.clone()),
            RemoteScript::Failure(message) => Err(anyhow!(message.clone())),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingRouter {
    navigations: StdMutex<Vec<(String, Option<Value>, bool)>>,
}

impl RecordingRouter {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn navigations(&self) -> Vec<(String, Option<Value>, bool)> {
        self.navigations.lock().expect("navigations").clone()
    }
}

#[async_trait]
impl Router for RecordingRouter {
    async fn navigate(&self, path: &str, state: Option<Value>, replace: bool) -> Result<()> {
        self.navigations
            .lock()
            .expect("navigations")
            .push((path.to_string(), state, replace));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingEditor {
    calls: StdMutex<Vec<String>>,
}

impl RecordingEditor {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    fn push(&self, call: String) {
        self.calls.lock().expect("calls").push(call);
    }
}

#[async_trait]
impl BugEditor for RecordingEditor {
    async fn attach_files(&self, _bug_id: BugId, files: &[String]) -> Result<()> {
        self.push(format!("attach_files:{}", files.join("+")));
        Ok(())
    }

    async fn attach_text(&self, _bug_id: BugId, text: &str) -> Result<()> {
        self.push(format!("attach_text:{text}"));
        Ok(())
    }

    async fn remove_attachment(&self, _bug_id: BugId, hash: &str) -> Result<()> {
        self.push(format!("remove_attachment:{hash}"));
        Ok(())
    }

    async fn move_up_attachment(&self, _bug_id: BugId, hash: &str) -> Result<()> {
        self.push(format!("move_up_attachment:{hash}"));
        Ok(())
    }

    async fn move_down_attachment(&self, _bug_id: BugId, hash: &str) -> Result<()> {
        self.push(format!("move_down_attachment:{hash}"));
        Ok(())
    }

    async fn edit_attachment(
        &self,
        _bug_id: BugId,
        hash: &str,
        name: &str,
        value: &Value,
    ) -> Result<()> {
        self.push(format!("edit_attachment:{hash}:{name}:{value}"));
        Ok(())
    }

    async fn update_subscription(&self, _bug_id: BugId, change: SubscriptionChange) -> Result<()> {
        self.push(format!("update_subscription:{change:?}"));
        Ok(())
    }

    async fn edit_comment(&self, _bug_id: BugId, text: &str) -> Result<()> {
        self.push(format!("edit_comment:{text}"));
        Ok(())
    }

    async fn edit_field(&self, _bug_id: BugId, name: &str, value: &Value) -> Result<()> {
        self.push(format!("edit_field:{name}:{value}"));
        Ok(())
    }

    async fn edit_flag(&self, _bug_id: BugId, flag: &str, added: bool) -> Result<()> {
        self.push(format!("edit_flag:{flag}:{added}"));
        Ok(())
    }

    async fn add_field_value(&self, _bug_id: BugId, field: &str, value: &str) -> Result<()> {
        self.push(format!("add_field_value:{field}:{value}"));
        Ok(())
    }

    async fn remove_field_value(&self, _bug_id: BugId, field: &str, value: &str) -> Result<()> {
        self.push(format!("remove_field_value:{field}:{value}"));
        Ok(())
    }

    async fn add_participant(&self, _bug_id: BugId, field: &str, email: &str) -> Result<()> {
        self.push(format!("add_participant:{field}:{email}"));
        Ok(())
    }

    async fn remove_participant(&self, _bug_id: BugId, field: &str, email: &str) -> Result<()> {
        self.push(format!("remove_participant:{field}:{email}"));
        Ok(())
    }

    async fn submit(&self, _bug_id: BugId) -> Result<()> {
        self.push("submit".to_string());
        Ok(())
    }
}
