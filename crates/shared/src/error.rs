use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unknown or unclassified unavailability.
pub const GENERIC_ERROR_CODE: i64 = 0;
/// The tracker refused access to the record, usually because it carries
/// sensitive content.
pub const FORBIDDEN_ERROR_CODE: i64 = 102;

pub const UNAVAILABLE_MESSAGE: &str = "This bug data is not available.";
pub const OFFLINE_MESSAGE: &str = "You have to go online to load the bug.";
pub const REMOTE_FAILURE_MESSAGE: &str = "Failed to retrieve data from the remote tracker.";
pub const FORBIDDEN_MESSAGE: &str = "You are not authorized to access this bug, probably because \
     it has sensitive information such as unpublished security issues or marketing-related topics.";

/// Error descriptor the remote tracker attaches to a record it will not
/// serve. Cached alongside the record so a later offline session sees the
/// same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("bug error {code}: {message}")]
pub struct BugError {
    pub code: i64,
    pub message: String,
}

impl BugError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.code == FORBIDDEN_ERROR_CODE
    }
}
