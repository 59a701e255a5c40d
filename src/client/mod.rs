//! Client side of the board: the callable HTTP client and the live request list.

mod live_list;

pub use live_list::*;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::api::{CallableBody, CallableResponse};
use crate::auth::{API_KEY_HEADER, UID_HEADER};
use crate::errors::{AppError, ErrorResponse};
use crate::models::{AddRequestData, AddRequestResult, FeatureRequest, SayHelloData, UpvoteData};

/// Anything that can cast an upvote on behalf of a signed-in user.
#[async_trait]
pub trait Upvoter: Send + Sync {
    async fn upvote(&self, request_id: &str) -> Result<(), AppError>;
}

/// HTTP client for the board's callable endpoints.
#[derive(Debug, Clone)]
pub struct CallableClient {
    http: reqwest::Client,
    base_url: String,
    uid: Option<String>,
    api_key: Option<String>,
}

impl CallableClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            uid: None,
            api_key: None,
        }
    }

    /// Act as the given signed-in user.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn authorize(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(uid) = &self.uid {
            builder = builder.header(UID_HEADER, uid);
        }
        builder
    }

    /// Invoke a callable endpoint and unwrap its result envelope.
    pub async fn call<D, R>(&self, name: &str, data: D) -> Result<R, AppError>
    where
        D: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, name);
        let response = self
            .authorize(self.http.post(url))
            .json(&CallableBody { data })
            .send()
            .await?;

        if response.status().is_success() {
            let body: CallableResponse<R> = response.json().await?;
            return Ok(body.result);
        }

        Err(error_from_response(response, name).await)
    }

    pub async fn say_hello(&self, name: &str) -> Result<String, AppError> {
        self.call(
            "sayHello",
            SayHelloData {
                name: name.to_string(),
            },
        )
        .await
    }

    /// Submit a request and return its id.
    pub async fn add_request(&self, text: &str) -> Result<String, AppError> {
        let result: AddRequestResult = self
            .call(
                "addRequest",
                AddRequestData {
                    text: text.to_string(),
                },
            )
            .await?;
        Ok(result.id)
    }

    /// Fetch one snapshot of the ranked request list.
    pub async fn list_requests(&self) -> Result<Vec<FeatureRequest>, AppError> {
        let url = format!("{}/requests", self.base_url);
        let response = self.authorize(self.http.get(url)).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "requests").await);
        }

        let body: CallableResponse<Vec<FeatureRequest>> = response.json().await?;
        Ok(body.result)
    }
}

/// Decode an error envelope, falling back to an opaque error for non-envelope bodies.
async fn error_from_response(response: reqwest::Response, endpoint: &str) -> AppError {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => AppError::from_status(&body.error.status, body.error.message),
        Err(_) => AppError::Internal(format!("{} failed with HTTP {}", endpoint, status)),
    }
}

#[async_trait]
impl Upvoter for CallableClient {
    async fn upvote(&self, request_id: &str) -> Result<(), AppError> {
        self.call(
            "upvote",
            UpvoteData {
                id: request_id.to_string(),
            },
        )
        .await
    }
}
