//! The signed-in user's dashboard.

use std::fmt::Write;

use xphub_client::{ConnectionState, Queries};
use xphub_shared::ApiError;

use crate::components::{Navbar, ToolsGrid, UserCard, XpProgress};

pub async fn render(queries: &Queries, connection: Option<&ConnectionState>) -> Result<String, ApiError> {
    let mut out = String::new();

    let Some(user) = queries.current_user().await? else {
        let _ = write!(out, "{}", Navbar { username: None, connection });
        let _ = writeln!(out, "Welcome to xphub!");
        let _ = writeln!(out, "Connect your Discord account to get started:");
        let _ = writeln!(out, "  xphub login <discord-id> [token]");
        return Ok(out);
    };

    // Tools failing to load still leaves the rest of the dashboard useful.
    let tools = queries.tools(&user.discord_id).await;

    let _ = write!(
        out,
        "{}",
        Navbar {
            username: Some(&user.username),
            connection
        }
    );
    let _ = writeln!(out, "Dashboard\n");
    let _ = writeln!(out, "{}", UserCard(&user));
    let _ = writeln!(out, "{}", XpProgress(&user));
    let _ = writeln!(out, "Your Tools");
    match tools {
        Ok(tools) => {
            let _ = write!(out, "{}", ToolsGrid { tools: &tools, show_unlock: true });
        }
        Err(e) => {
            tracing::warn!(error = %e, "tools unavailable");
            let _ = writeln!(out, "  Tools unavailable: {}", e.user_message());
        }
    }

    Ok(out)
}
