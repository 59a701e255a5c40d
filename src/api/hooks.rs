//! Identity provider lifecycle webhooks.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::{callable_data, success, ApiResult, CallableBody};
use crate::models::{IdentityUser, Profile};
use crate::AppState;

/// POST /hooks/identity/created - Create the profile of a new account.
pub async fn identity_created(
    State(state): State<AppState>,
    payload: Result<Json<CallableBody<IdentityUser>>, JsonRejection>,
) -> ApiResult<Profile> {
    let user = callable_data(payload)?;
    let profile = state.board.on_identity_created(&user).await?;
    success(profile)
}

/// POST /hooks/identity/deleted - Drop the profile of a deleted account.
pub async fn identity_deleted(
    State(state): State<AppState>,
    payload: Result<Json<CallableBody<IdentityUser>>, JsonRejection>,
) -> ApiResult<()> {
    let user = callable_data(payload)?;
    state.board.on_identity_deleted(&user).await?;
    success(())
}
