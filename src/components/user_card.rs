use std::fmt;

use xphub_shared::User;

use super::{thousands, tier_badge};

/// Identity, level, tier and headline stats.
pub struct UserCard<'a>(pub &'a User);

impl fmt::Display for UserCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self.0;
        writeln!(f, "{}", user.username)?;
        writeln!(
            f,
            "{} {} Tier · Level {}",
            tier_badge(user.rank_tier),
            user.rank_tier,
            user.level
        )?;
        if let Some(avatar) = &user.avatar_url {
            writeln!(f, "Avatar: {avatar}")?;
        }
        writeln!(f)?;
        writeln!(f, "  Total XP       {:>10}", thousands(user.xp))?;
        writeln!(f, "  Streak         {:>10}", format!("{} days", user.streak_days))?;
        writeln!(f, "  Tools          {:>10}", user.unlocked_tools_count)?;
        writeln!(f, "  Next level in  {:>10}", format!("{} XP", thousands(user.next_level_xp)))
    }
}
