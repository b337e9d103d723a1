//! Tool catalogue, per-user tool status and unlocking.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use xphub_shared::{ServerEvent, Tool, ToolStatus, ToolUnlockedEvent, UnlockResponse};

use super::{failure, ApiResult};
use crate::db::{UnlockError, Unlocked};
use crate::state::AppState;

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<Tool>> {
    Json(state.db.read().await.tools())
}

pub async fn user_tools(
    State(state): State<AppState>,
    Path(discord_id): Path<String>,
) -> ApiResult<Vec<ToolStatus>> {
    state
        .db
        .read()
        .await
        .user_tools(&discord_id)
        .map(Json)
        .ok_or_else(|| {
            failure(
                StatusCode::NOT_FOUND,
                format!("User with Discord ID {discord_id} not found"),
            )
        })
}

/// Unlock a tool and announce it on the push channel.
pub async fn unlock_tool(
    State(state): State<AppState>,
    Path((discord_id, tool_id)): Path<(String, String)>,
) -> ApiResult<UnlockResponse> {
    let result = state.db.write().await.unlock(&discord_id, &tool_id);

    match result {
        Ok(Unlocked::New(tool)) => {
            tracing::info!(%discord_id, tool = %tool.name, "tool unlocked");
            state.broadcast(ServerEvent::ToolUnlocked(ToolUnlockedEvent {
                discord_id,
                tool_id: tool.id,
                tool_name: tool.name.clone(),
                timestamp: Some(Utc::now()),
            }));
            Ok(Json(UnlockResponse {
                message: "Tool unlocked successfully".to_string(),
                already_unlocked: false,
                tool_name: Some(tool.name),
            }))
        }
        Ok(Unlocked::Already(_)) => Ok(Json(UnlockResponse {
            message: "Tool already unlocked".to_string(),
            already_unlocked: true,
            tool_name: None,
        })),
        Err(e) => {
            let status = match e {
                UnlockError::UserNotFound(_) | UnlockError::ToolNotFound(_) => StatusCode::NOT_FOUND,
                UnlockError::LevelTooLow { .. } => StatusCode::FORBIDDEN,
            };
            tracing::debug!(%discord_id, %tool_id, error = %e, "unlock refused");
            Err(failure(status, e.to_string()))
        }
    }
}
