//! Caller authentication.
//!
//! Two layers: the identity gateway proves itself with a pre-shared key
//! (constant-time compared), and it forwards the resolved caller uid in
//! [`UID_HEADER`]. Handlers read the uid through [`CallerContext`].

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the uid resolved by the identity gateway.
pub const UID_HEADER: &str = "x-auth-uid";

/// Identity of a signed-in caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub uid: String,
}

/// Per-invocation caller information. `auth` is `None` for anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub auth: Option<AuthContext>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self { auth: None }
    }

    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self {
            auth: Some(AuthContext { uid: uid.into() }),
        }
    }

    /// Fail with `Unauthenticated` unless the caller has a resolved identity.
    pub fn require_auth(&self) -> Result<&AuthContext, AppError> {
        tracing::debug!("Checking auth state...");
        self.auth.as_ref().ok_or_else(|| {
            AppError::Unauthenticated("Only Authenticated Users can add requests".to_string())
        })
    }
}

impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get(UID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        Ok(match uid {
            Some(uid) => CallerContext::signed_in(uid),
            None => CallerContext::anonymous(),
        })
    }
}

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match provided {
        Some(provided_key) => {
            if constant_time_compare(&provided_key, &expected) {
                next.run(request).await
            } else {
                unauthorized_response("Invalid API key")
            }
        }
        None => {
            // Also accept the key as a bearer token
            let bearer = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string());

            match bearer {
                Some(bearer_key) if constant_time_compare(&bearer_key, &expected) => {
                    next.run(request).await
                }
                _ => unauthorized_response("Missing or invalid API key"),
            }
        }
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    tracing::warn!("Rejected gateway request: {}", message);
    AppError::Unauthenticated(message.to_string()).into_response()
}
