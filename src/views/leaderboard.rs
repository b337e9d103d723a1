//! Global leaderboard.

use std::fmt::Write;

use xphub_client::Queries;
use xphub_shared::ApiError;

use crate::components::LeaderboardTable;

pub async fn render(queries: &Queries, limit: u32) -> Result<String, ApiError> {
    let entries = queries.leaderboard(limit).await?;

    let mut out = String::new();
    let _ = writeln!(out, "🏆 Leaderboard · top {limit}\n");
    if entries.is_empty() {
        let _ = writeln!(out, "No ranked users yet.");
    } else {
        let _ = write!(out, "{}", LeaderboardTable(&entries));
    }
    Ok(out)
}
