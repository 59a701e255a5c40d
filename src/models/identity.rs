//! Identity provider payloads.

use serde::{Deserialize, Serialize};

/// Account record delivered by the identity provider's lifecycle webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}
