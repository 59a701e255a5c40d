//! Ranked request list endpoints.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::Stream;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::live::{snapshot_stream, sse_response};
use crate::models::FeatureRequest;
use crate::AppState;

/// GET /requests - Current list, most upvoted first.
pub async fn list_requests(State(state): State<AppState>) -> ApiResult<Vec<FeatureRequest>> {
    success(state.repo.list_requests().await?)
}

/// GET /requests/live - Server-Sent Events stream of full list snapshots.
pub async fn live_requests(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (initial, rx) = state.repo.subscribe_requests().await?;
    tracing::debug!(requests = initial.len(), "Live subscriber attached");
    Ok(sse_response(snapshot_stream(initial, rx)))
}
