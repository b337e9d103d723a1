use std::fmt;

use xphub_client::UnlockState;
use xphub_shared::{RankTier, ToolStatus};

/// One tool with its unlock state.
pub struct ToolCard<'a> {
    pub status: &'a ToolStatus,
    /// Print the unlock command for available tools.
    pub show_unlock: bool,
}

impl fmt::Display for ToolCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ToolStatus { tool, usage_count, unlocked_at, .. } = self.status;
        let state = UnlockState::of(self.status);
        let marker = match state {
            UnlockState::Unlocked => "✔",
            UnlockState::Available => "○",
            UnlockState::Locked => "🔒",
        };

        write!(f, "  {marker} {} {:<24} Lv {:>2}  {}", tool.icon, tool.name, tool.required_level, state)?;
        match state {
            UnlockState::Unlocked => {
                write!(f, "  · used {usage_count}x")?;
                if let Some(at) = unlocked_at {
                    write!(f, " · since {}", at.format("%Y-%m-%d"))?;
                }
            }
            UnlockState::Available if self.show_unlock => {
                write!(f, "  → xphub unlock {}", tool.id)?;
            }
            _ => {}
        }
        writeln!(f)
    }
}

/// Tools grouped by tier, lowest tier first.
pub struct ToolsGrid<'a> {
    pub tools: &'a [ToolStatus],
    pub show_unlock: bool,
}

impl fmt::Display for ToolsGrid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tools.is_empty() {
            writeln!(f, "  🔒 No Tools Yet")?;
            return writeln!(f, "  Keep earning XP to unlock tools!");
        }

        for tier in RankTier::ALL {
            let mut in_tier = self.tools.iter().filter(|s| s.tool.tier == tier).peekable();
            if in_tier.peek().is_none() {
                continue;
            }
            writeln!(f, "{tier} Tier")?;
            for status in in_tier {
                write!(
                    f,
                    "{}",
                    ToolCard {
                        status,
                        show_unlock: self.show_unlock
                    }
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xphub_shared::Tool;

    fn status(id: &str, tier: RankTier, required_level: u32, is_unlocked: bool, can_unlock: bool) -> ToolStatus {
        ToolStatus {
            tool: Tool {
                id: id.to_string(),
                name: id.to_string(),
                description: String::new(),
                icon: "🛠️".to_string(),
                required_level,
                tier,
                enabled: true,
                config: Default::default(),
            },
            is_unlocked,
            unlocked_at: None,
            usage_count: 3,
            can_unlock,
        }
    }

    #[test]
    fn groups_by_tier_in_order() {
        let tools = vec![
            status("voice", RankTier::Member, 11, false, false),
            status("chat", RankTier::Basic, 1, true, false),
            status("rewards", RankTier::Basic, 5, false, true),
        ];
        let text = ToolsGrid { tools: &tools, show_unlock: true }.to_string();

        let basic = text.find("Basic Tier").unwrap();
        let member = text.find("Member Tier").unwrap();
        assert!(basic < member);
        assert!(!text.contains("Advanced Tier"));
        assert!(text.contains("xphub unlock rewards"));
        assert!(!text.contains("xphub unlock voice"));
        assert!(text.contains("used 3x"));
    }

    #[test]
    fn unlock_hint_is_optional() {
        let tools = vec![status("rewards", RankTier::Basic, 5, false, true)];
        let text = ToolsGrid { tools: &tools, show_unlock: false }.to_string();
        assert!(text.contains("Available"));
        assert!(!text.contains("xphub unlock"));
    }

    #[test]
    fn empty_grid_encourages() {
        let text = ToolsGrid { tools: &[], show_unlock: true }.to_string();
        assert!(text.contains("No Tools Yet"));
    }
}
