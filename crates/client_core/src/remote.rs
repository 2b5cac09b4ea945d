use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use shared::{
    domain::BugId,
    error::{BugError, GENERIC_ERROR_CODE},
    protocol::{BugPayload, BugRecord},
};

/// Columns requested for every bug, mirroring the thread list.
pub const DEFAULT_FIELDS: &[&str] = &[
    "id",
    "summary",
    "status",
    "resolution",
    "product",
    "component",
    "keywords",
    "creator",
    "assigned_to",
    "qa_contact",
    "mentors",
    "creation_time",
    "last_change_time",
];

/// Detail fields only wanted on full record loads.
pub const EXTRA_FIELDS: &[&str] = &["cc", "comments"];

/// Inclusion/exclusion field-name lists concatenated into the fetch query.
#[derive(Debug, Clone)]
pub struct FieldSelection {
    pub include_fields: Vec<String>,
    pub exclude_fields: Vec<String>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            include_fields: DEFAULT_FIELDS
                .iter()
                .chain(EXTRA_FIELDS)
                .map(ToString::to_string)
                .collect(),
            exclude_fields: vec!["attachments.data".to_string()],
        }
    }
}

impl FieldSelection {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("include_fields", self.include_fields.join(",")),
            ("exclude_fields", self.exclude_fields.join(",")),
        ]
    }
}

/// The remote tracker: identifier in, record or failure out.
#[async_trait]
pub trait RemoteTracker: Send + Sync {
    async fn fetch_bug(&self, bug_id: BugId, selection: &FieldSelection) -> Result<BugRecord>;
}

pub struct MissingRemoteTracker;

#[async_trait]
impl RemoteTracker for MissingRemoteTracker {
    async fn fetch_bug(&self, bug_id: BugId, _selection: &FieldSelection) -> Result<BugRecord> {
        Err(anyhow!(
            "remote tracker is unavailable for bug {}",
            bug_id.0
        ))
    }
}

/// REST client for the tracker's bug endpoint.
pub struct HttpRemoteTracker {
    http: Client,
    origin: String,
}

#[derive(Debug, Deserialize)]
struct FetchBugResponse {
    #[serde(default)]
    bugs: Vec<BugPayload>,
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpRemoteTracker {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            origin: origin.into(),
        }
    }
}

#[async_trait]
impl RemoteTracker for HttpRemoteTracker {
    async fn fetch_bug(&self, bug_id: BugId, selection: &FieldSelection) -> Result<BugRecord> {
        let response: FetchBugResponse = self
            .http
            .get(format!("{}/rest/bug/{}", self.origin, bug_id.0))
            .query(&selection.query_pairs())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("malformed tracker response for bug {}", bug_id.0))?;

        if response.error.unwrap_or(false) {
            return Ok(BugRecord {
                bug_id,
                data: None,
                error: Some(BugError::new(
                    response.code.unwrap_or(GENERIC_ERROR_CODE),
                    response.message.unwrap_or_default(),
                )),
                fetched_at: Utc::now(),
            });
        }

        let data = response
            .bugs
            .into_iter()
            .find(|bug| bug.id == bug_id)
            .ok_or_else(|| anyhow!("tracker response did not include bug {}", bug_id.0))?;

        Ok(BugRecord {
            bug_id,
            data: Some(data),
            error: None,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
