//! Callable endpoints.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::{callable_data, success, ApiResult, CallableBody};
use crate::auth::CallerContext;
use crate::board::RequestBoard;
use crate::models::{AddRequestData, AddRequestResult, SayHelloData, UpvoteData};
use crate::AppState;

/// POST /sayHello - Greet the given name.
pub async fn say_hello(
    payload: Result<Json<CallableBody<SayHelloData>>, JsonRejection>,
) -> ApiResult<String> {
    let data = callable_data(payload)?;
    success(RequestBoard::say_hello(&data.name))
}

/// POST /addRequest - Submit a new feature request.
pub async fn add_request(
    State(state): State<AppState>,
    caller: CallerContext,
    payload: Result<Json<CallableBody<AddRequestData>>, JsonRejection>,
) -> ApiResult<AddRequestResult> {
    caller.require_auth()?;
    let data = callable_data(payload)?;

    let request = state.board.submit_request(&caller, &data.text).await?;
    success(AddRequestResult { id: request.id })
}

/// POST /upvote - Upvote a feature request once per user.
pub async fn upvote(
    State(state): State<AppState>,
    caller: CallerContext,
    payload: Result<Json<CallableBody<UpvoteData>>, JsonRejection>,
) -> ApiResult<()> {
    caller.require_auth()?;
    let data = callable_data(payload)?;

    state.board.upvote(&caller, &data.id).await?;
    success(())
}
