//! In-memory store for users, tools and tool access.
//!
//! Seeded with one test user and the five starter tools. Derived fields
//! (`rank_tier`, `next_level_xp`, `unlocked_tools_count`, `can_unlock`) are
//! computed on read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use xphub_shared::{
    level_from_xp, tier_for_level, xp_to_next_level, LeaderboardEntry, RankTier, Tool, ToolStatus,
    User,
};

pub const TEST_DISCORD_ID: &str = "123456789";

/// Upper bound on a leaderboard page.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
struct UserRecord {
    id: String,
    discord_id: String,
    username: String,
    avatar_url: Option<String>,
    xp: i64,
    level: u32,
    streak_days: u32,
}

#[derive(Debug, Clone)]
struct Access {
    unlocked_at: DateTime<Utc>,
    usage_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnlockError {
    #[error("User with Discord ID {0} not found")]
    UserNotFound(String),
    #[error("Tool with ID {0} not found")]
    ToolNotFound(String),
    #[error("User level {level} is below required level {required}")]
    LevelTooLow { level: u32, required: u32 },
}

/// Successful unlock.
#[derive(Debug, Clone, PartialEq)]
pub enum Unlocked {
    New(Tool),
    Already(Tool),
}

#[derive(Debug, Default)]
pub struct Db {
    users: HashMap<String, UserRecord>,
    tools: Vec<Tool>,
    /// user id -> tool id -> access
    access: HashMap<String, HashMap<String, Access>>,
}

impl Db {
    pub fn seeded() -> Self {
        let mut db = Db::default();

        let starter_tools = [
            ("basic-chat", "Basic Chat", RankTier::Basic, 1, "💬"),
            ("profile-customization", "Profile Customization", RankTier::Basic, 1, "🎨"),
            ("daily-rewards", "Daily Rewards", RankTier::Basic, 5, "🎁"),
            ("voice-channels", "Voice Channels", RankTier::Member, 11, "🎤"),
            ("ai-chat-assistant", "AI Chat Assistant", RankTier::Advanced, 26, "🤖"),
        ];
        for (id, name, tier, required_level, icon) in starter_tools {
            db.add_tool(Tool {
                id: id.to_string(),
                name: name.to_string(),
                description: format!("Access to {name}"),
                icon: icon.to_string(),
                required_level,
                tier,
                enabled: true,
                config: Default::default(),
            });
        }

        // The seeded level is stored, not derived, like a record synced from the bot.
        let user_id = Uuid::new_v4().to_string();
        db.users.insert(
            TEST_DISCORD_ID.to_string(),
            UserRecord {
                id: user_id.clone(),
                discord_id: TEST_DISCORD_ID.to_string(),
                username: "TestUser".to_string(),
                avatar_url: Some("https://cdn.discordapp.com/embed/avatars/0.png".to_string()),
                xp: 250,
                level: 3,
                streak_days: 5,
            },
        );
        let now = Utc::now();
        let granted = db.access.entry(user_id).or_default();
        for tool in db.tools.iter().take(2) {
            granted.insert(
                tool.id.clone(),
                Access {
                    unlocked_at: now,
                    usage_count: 0,
                },
            );
        }

        db
    }

    pub fn add_tool(&mut self, tool: Tool) {
        self.tools.retain(|t| t.id != tool.id);
        self.tools.push(tool);
        self.tools.sort_by_key(|t| t.required_level);
    }

    /// Insert or replace a user; the level follows from `xp`.
    pub fn upsert_user(&mut self, discord_id: &str, username: &str, xp: i64) -> User {
        let id = self
            .users
            .get(discord_id)
            .map(|u| u.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = UserRecord {
            id,
            discord_id: discord_id.to_string(),
            username: username.to_string(),
            avatar_url: None,
            xp,
            level: level_from_xp(xp),
            streak_days: 0,
        };
        let user = self.to_user(&record);
        self.users.insert(discord_id.to_string(), record);
        user
    }

    pub fn user(&self, discord_id: &str) -> Option<User> {
        self.users.get(discord_id).map(|r| self.to_user(r))
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Enabled tools, lowest required level first.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().filter(|t| t.enabled).cloned().collect()
    }

    /// Users by XP, highest first, ranked densely from 1. Ties break on
    /// Discord ID so the order is stable.
    pub fn leaderboard(&self, limit: u32) -> Vec<LeaderboardEntry> {
        let mut records: Vec<&UserRecord> = self.users.values().collect();
        records.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.discord_id.cmp(&b.discord_id)));

        records
            .into_iter()
            .take(limit.min(MAX_LEADERBOARD_LIMIT) as usize)
            .zip(1u32..)
            .map(|(record, rank)| LeaderboardEntry {
                rank,
                user: self.to_user(record),
                xp: record.xp,
                level: record.level,
            })
            .collect()
    }

    /// Every enabled tool with the user's access to it, or `None` for an
    /// unknown user.
    pub fn user_tools(&self, discord_id: &str) -> Option<Vec<ToolStatus>> {
        let user = self.users.get(discord_id)?;
        let granted = self.access.get(&user.id);

        let statuses = self
            .tools
            .iter()
            .filter(|t| t.enabled)
            .map(|tool| {
                let access = granted.and_then(|g| g.get(&tool.id));
                let is_unlocked = access.is_some();
                ToolStatus {
                    tool: tool.clone(),
                    is_unlocked,
                    unlocked_at: access.map(|a| a.unlocked_at),
                    usage_count: access.map(|a| a.usage_count).unwrap_or(0),
                    can_unlock: !is_unlocked && user.level >= tool.required_level,
                }
            })
            .collect();

        Some(statuses)
    }

    pub fn unlock(&mut self, discord_id: &str, tool_id: &str) -> Result<Unlocked, UnlockError> {
        let user = self
            .users
            .get(discord_id)
            .ok_or_else(|| UnlockError::UserNotFound(discord_id.to_string()))?;
        let tool = self
            .tools
            .iter()
            .find(|t| t.id == tool_id)
            .ok_or_else(|| UnlockError::ToolNotFound(tool_id.to_string()))?;

        if user.level < tool.required_level {
            return Err(UnlockError::LevelTooLow {
                level: user.level,
                required: tool.required_level,
            });
        }

        let granted = self.access.entry(user.id.clone()).or_default();
        if granted.contains_key(tool_id) {
            return Ok(Unlocked::Already(tool.clone()));
        }
        granted.insert(
            tool_id.to_string(),
            Access {
                unlocked_at: Utc::now(),
                usage_count: 0,
            },
        );
        Ok(Unlocked::New(tool.clone()))
    }

    fn to_user(&self, record: &UserRecord) -> User {
        let unlocked_tools_count = self
            .access
            .get(&record.id)
            .map(|g| g.len() as u32)
            .unwrap_or(0);

        User {
            id: record.id.clone(),
            discord_id: record.discord_id.clone(),
            username: record.username.clone(),
            avatar_url: record.avatar_url.clone(),
            xp: record.xp,
            level: record.level,
            rank_tier: tier_for_level(record.level),
            streak_days: record.streak_days,
            unlocked_tools_count,
            next_level_xp: xp_to_next_level(record.xp, record.level),
        }
    }
}
