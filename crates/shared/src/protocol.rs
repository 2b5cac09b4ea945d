use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{BugId, ContainerId},
    error::BugError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugComment {
    pub number: i64,
    pub author: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
}

/// Payload of one issue record as served by the remote tracker. Every field
/// except the id is optional because the field selection on the request
/// decides what comes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugPayload {
    pub id: BugId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<BugComment>,
}

impl BugPayload {
    pub fn empty(id: BugId) -> Self {
        Self {
            id,
            summary: None,
            status: None,
            resolution: None,
            product: None,
            component: None,
            keywords: Vec::new(),
            creator: None,
            assigned_to: None,
            qa_contact: None,
            mentors: Vec::new(),
            cc: Vec::new(),
            creation_time: None,
            last_change_time: None,
            comments: Vec::new(),
        }
    }

    /// The minimal field a record must carry to be presentable at all.
    pub fn has_summary(&self) -> bool {
        self.summary
            .as_deref()
            .is_some_and(|summary| !summary.trim().is_empty())
    }

    /// Every participant identity on the record, in first-seen order:
    /// reporter, assignee, QA contact, mentors, cc list, comment authors.
    pub fn participants(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let singles = [&self.creator, &self.assigned_to, &self.qa_contact];
        let candidates = singles
            .into_iter()
            .flatten()
            .chain(self.mentors.iter())
            .chain(self.cc.iter())
            .chain(self.comments.iter().map(|comment| &comment.author));
        for email in candidates {
            if !email.is_empty() && !seen.contains(email) {
                seen.push(email.clone());
            }
        }
        seen
    }
}

/// One cached record. `data` and `error` can coexist: the tracker may serve
/// a partial payload together with an error descriptor, and the cache keeps
/// whatever the last retrieval produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugRecord {
    pub bug_id: BugId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BugPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BugError>,
    pub fetched_at: DateTime<Utc>,
}

impl BugRecord {
    /// Whether a cache hit can be served without consulting the tracker:
    /// no error descriptor and a payload carrying the summary field.
    pub fn is_usable(&self) -> bool {
        self.error.is_none() && self.data.as_ref().is_some_and(BugPayload::has_summary)
    }
}

/// Snapshot of the navigation state a shell reports to presenters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    pub pathname: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

// Presenter-originated topic payloads.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingStarted {
    pub container_id: ContainerId,
    pub bug_id: BugId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingFinished {
    pub container_id: ContainerId,
    pub bug_id: BugId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugDataAvailable {
    pub container_id: ContainerId,
    pub bug_id: BugId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<BugId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugDataUnavailable {
    pub container_id: ContainerId,
    pub bug_id: BugId,
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryUpdated {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUpdated {
    pub emails: Vec<String>,
}

// View-originated intent payloads, each mapped 1:1 to a record-mutation
// collaborator call.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachFiles {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachText {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveAttachment {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveUpAttachment {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveDownAttachment {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditAttachment {
    pub hash: String,
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditComment {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditField {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFlag {
    pub flag: String,
    pub added: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFieldValue {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveFieldValue {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddParticipant {
    pub field: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveParticipant {
    pub field: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSelected {
    pub number: i64,
}
