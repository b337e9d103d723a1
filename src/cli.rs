//! Command-line interface.

use clap::{Parser, Subcommand};
use xphub_client::DEFAULT_LEADERBOARD_LIMIT;

#[derive(Debug, Parser)]
#[command(name = "xphub", version)]
#[command(about = "XP, levels and tool unlocks for your Discord community")]
#[command(after_help = "Environment: XPHUB_API_URL, XPHUB_SOCKET_URL, XPHUB_LOGIN_URL, RUST_LOG")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    /// The requested command; the dashboard when none is given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Dashboard)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show your dashboard
    Dashboard,
    /// Show someone's profile
    Profile { discord_id: String },
    /// Show the top users
    Leaderboard {
        #[arg(default_value_t = DEFAULT_LEADERBOARD_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
    /// Remember who you are
    Login {
        discord_id: String,
        token: Option<String>,
    },
    /// Forget the stored identity and token
    Logout,
    /// Unlock an available tool by id or name
    Unlock { tool: String },
    /// Live dashboard, updated by push events
    Watch,
}
