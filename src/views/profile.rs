//! Someone's public profile: stats and the tools they have unlocked.

use std::fmt::Write;

use xphub_client::Queries;
use xphub_shared::{ApiError, ToolStatus};

use crate::components::{Navbar, ToolsGrid, UserCard, XpProgress};

pub async fn render(queries: &Queries, discord_id: &str) -> Result<String, ApiError> {
    let mut out = String::new();

    let user = match queries.user(discord_id).await {
        Ok(user) => user,
        Err(e) if e.status() == Some(404) => {
            let _ = writeln!(out, "User Not Found");
            let _ = writeln!(out, "No user with Discord ID {discord_id}.");
            return Ok(out);
        }
        Err(e) => return Err(e),
    };

    let unlocked: Vec<ToolStatus> = queries
        .tools(discord_id)
        .await?
        .into_iter()
        .filter(|s| s.is_unlocked)
        .collect();

    let viewer = queries.session().discord_id();
    let _ = write!(
        out,
        "{}",
        Navbar {
            username: viewer.as_deref(),
            connection: None
        }
    );
    let _ = writeln!(out, "{}'s Profile\n", user.username);
    let _ = writeln!(out, "{}", UserCard(&user));
    let _ = writeln!(out, "{}", XpProgress(&user));
    let _ = writeln!(out, "Unlocked Tools");
    let _ = write!(out, "{}", ToolsGrid { tools: &unlocked, show_unlock: false });

    Ok(out)
}
