//! Leaderboard route.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use xphub_shared::LeaderboardEntry;

use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<Vec<LeaderboardEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(state.db.read().await.leaderboard(limit))
}
