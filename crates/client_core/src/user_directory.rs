use std::{collections::HashSet, sync::Arc};

use tokio::sync::Mutex;

use shared::protocol::{BugPayload, DirectoryUpdated};

use crate::event_bus::{EventBus, Presenter};

/// Tracks participant identities observed across loaded records and
/// announces the ones seen for the first time.
pub struct UserDirectory {
    presenter: Presenter,
    known: Mutex<HashSet<String>>,
}

impl UserDirectory {
    pub fn new(bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            presenter: Presenter::new("UserDirectory", bus),
            known: Mutex::new(HashSet::new()),
        })
    }

    /// Record every participant on the bug. Triggers
    /// `UserDirectoryPresenter#Updated` with the newly observed identities;
    /// silent when nothing is new.
    pub async fn add_from_bug(&self, bug: &BugPayload) {
        let mut newly = Vec::new();
        {
            let mut known = self.known.lock().await;
            for email in bug.participants() {
                if known.insert(email.clone()) {
                    newly.push(email);
                }
            }
        }

        if !newly.is_empty() {
            self.presenter
                .trigger("#Updated", &DirectoryUpdated { emails: newly })
                .await;
        }
    }

    pub async fn contains(&self, email: &str) -> bool {
        self.known.lock().await.contains(email)
    }
}
