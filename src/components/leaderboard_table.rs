use std::fmt;

use xphub_shared::LeaderboardEntry;

use super::thousands;

pub struct LeaderboardTable<'a>(pub &'a [LeaderboardEntry]);

fn rank_label(rank: u32) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("#{n}"),
    }
}

impl fmt::Display for LeaderboardTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<6}{:<24}{:>6}  {:<10}{:>12}", "RANK", "USER", "LEVEL", "TIER", "XP")?;
        for entry in self.0 {
            writeln!(
                f,
                "{:<6}{:<24}{:>6}  {:<10}{:>12}",
                rank_label(entry.rank),
                entry.user.username,
                entry.level,
                entry.user.rank_tier.as_str(),
                thousands(entry.xp)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xphub_shared::{RankTier, User};

    fn entry(rank: u32, name: &str, xp: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            rank,
            user: User {
                id: name.to_string(),
                discord_id: name.to_string(),
                username: name.to_string(),
                avatar_url: None,
                xp,
                level: 4,
                rank_tier: RankTier::Basic,
                streak_days: 0,
                unlocked_tools_count: 0,
                next_level_xp: 0,
            },
            xp,
            level: 4,
        }
    }

    #[test]
    fn medals_for_podium() {
        let entries = vec![
            entry(1, "alice", 3000),
            entry(2, "bob", 2000),
            entry(3, "carol", 1500),
            entry(4, "dave", 1000),
        ];
        let text = LeaderboardTable(&entries).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("🥇"));
        assert!(lines[4].starts_with("#4"));
        assert!(lines[1].contains("3,000"));
    }
}
