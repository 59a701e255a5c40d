//! Feature request model and callable payloads.

use serde::{Deserialize, Serialize};

/// Longest request text accepted, counted in UTF-16 code units as browsers do.
pub const MAX_REQUEST_TEXT_CHARS: usize = 30;

/// A submitted feature request with its vote counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRequest {
    pub id: String,
    pub text: String,
    pub upvotes: i64,
    pub created_at: String,
}

/// Payload of the `addRequest` callable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequestData {
    pub text: String,
}

/// Result of the `addRequest` callable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequestResult {
    pub id: String,
}

/// Payload of the `sayHello` callable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SayHelloData {
    pub name: String,
}

/// Payload of the `upvote` callable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpvoteData {
    pub id: String,
}
