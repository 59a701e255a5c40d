//! User profile model.

use serde::{Deserialize, Serialize};

/// Per-user record tracking which requests the user has upvoted.
///
/// Keyed by the identity provider's uid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Request ids in the order they were upvoted. Never holds duplicates.
    #[serde(default)]
    pub upvoted_on: Vec<String>,
    pub created_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default, skip_serializing)]
    pub version: i64,
}

impl Profile {
    pub fn has_upvoted(&self, request_id: &str) -> bool {
        self.upvoted_on.iter().any(|id| id == request_id)
    }
}
