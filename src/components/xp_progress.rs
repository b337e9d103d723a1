use std::fmt;

use xphub_shared::{LevelProgress, User};

use super::thousands;

const BAR_WIDTH: usize = 30;

/// Progress bar through the current level.
pub struct XpProgress<'a>(pub &'a User);

impl fmt::Display for XpProgress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self.0;
        let progress = LevelProgress::of(user);
        let percent = progress.bar_percent();
        let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;

        writeln!(f, "Level {} → {}", user.level, user.level + 1)?;
        writeln!(
            f,
            "[{}{}] {:>5.1}%",
            "█".repeat(filled),
            "░".repeat(BAR_WIDTH - filled),
            percent
        )?;
        writeln!(
            f,
            "{} XP of {} XP needed",
            thousands(progress.xp_in_level),
            thousands(progress.xp_span)
        )?;
        writeln!(f, "XP to next level: {}", thousands(user.next_level_xp))
    }
}
