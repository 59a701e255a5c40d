//! HTTP API module.
//!
//! Callable endpoints take `{"data": ...}` and answer `{"result": ...}`;
//! failures use the error envelope from [`crate::errors`].

mod callable;
mod hooks;
mod plain;
mod requests;

pub use callable::*;
pub use hooks::*;
pub use plain::*;
pub use requests::*;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Callable request envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallableBody<T> {
    pub data: T,
}

/// Callable success envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

impl<T: Serialize> CallableResponse<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

impl<T: Serialize> IntoResponse for CallableResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<CallableResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(result: T) -> ApiResult<T> {
    Ok(CallableResponse::new(result))
}

/// Unwrap the callable envelope, reporting malformed bodies as `InvalidArgument`.
pub fn callable_data<T>(
    payload: Result<Json<CallableBody<T>>, JsonRejection>,
) -> Result<T, AppError> {
    match payload {
        Ok(Json(body)) => Ok(body.data),
        Err(rejection) => {
            tracing::debug!("Rejected callable payload: {}", rejection.body_text());
            Err(AppError::InvalidArgument(format!(
                "Bad request payload: {}",
                rejection.body_text()
            )))
        }
    }
}
