use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use storage::Storage;

use shared::{domain::BugId, protocol::BugRecord};

/// Asynchronous key-value access to cached records.
#[async_trait]
pub trait BugStore: Send + Sync {
    async fn get(&self, bug_id: BugId) -> Result<Option<BugRecord>>;
    async fn save(&self, record: &BugRecord) -> Result<()>;
}

pub struct MissingBugStore;

#[async_trait]
impl BugStore for MissingBugStore {
    async fn get(&self, bug_id: BugId) -> Result<Option<BugRecord>> {
        Err(anyhow!("bug store is unavailable for bug {}", bug_id.0))
    }

    async fn save(&self, record: &BugRecord) -> Result<()> {
        Err(anyhow!(
            "bug store is unavailable for bug {}",
            record.bug_id.0
        ))
    }
}

/// sqlite-backed store shared by every presenter session.
pub struct DurableBugStore {
    store: Storage,
}

impl DurableBugStore {
    pub async fn initialize(database_url: &str) -> Result<Arc<Self>> {
        let store = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to initialize bug cache at '{database_url}'"))?;
        Ok(Arc::new(Self { store }))
    }

    pub fn storage(&self) -> &Storage {
        &self.store
    }
}

#[async_trait]
impl BugStore for DurableBugStore {
    async fn get(&self, bug_id: BugId) -> Result<Option<BugRecord>> {
        self.store.get_bug(bug_id).await
    }

    async fn save(&self, record: &BugRecord) -> Result<()> {
        self.store.save_bug(record).await
    }
}
