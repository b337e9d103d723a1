//! Text renderings of the dashboard's building blocks.
//!
//! Each component is a borrowed view over model data implementing
//! `Display`, so views compose them with `write!`.

mod leaderboard_table;
mod navbar;
mod tool_card;
mod user_card;
mod xp_progress;

pub use leaderboard_table::LeaderboardTable;
pub use navbar::Navbar;
pub use tool_card::ToolsGrid;
pub use user_card::UserCard;
pub use xp_progress::XpProgress;

use xphub_shared::RankTier;

/// `1234567` -> `1,234,567`
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn tier_badge(tier: RankTier) -> &'static str {
    match tier {
        RankTier::Basic => "🔰",
        RankTier::Member => "⭐",
        RankTier::Advanced => "💎",
        RankTier::Elite => "👑",
        RankTier::Master => "🏆",
    }
}
