//! User routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use xphub_shared::User;

use super::{failure, ApiResult};
use crate::state::AppState;

pub async fn get_user(State(state): State<AppState>, Path(discord_id): Path<String>) -> ApiResult<User> {
    state
        .db
        .read()
        .await
        .user(&discord_id)
        .map(Json)
        .ok_or_else(|| {
            failure(
                StatusCode::NOT_FOUND,
                format!("User with Discord ID {discord_id} not found"),
            )
        })
}
