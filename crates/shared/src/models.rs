//! Shared data models for the xphub REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Ranks ---

/// Rank tier a user (or tool) belongs to.
///
/// Serialized with the backend's display names (`"Basic"`, `"Member"`, ...).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RankTier {
    #[default]
    Basic,
    Member,
    Advanced,
    Elite,
    Master,
}

impl RankTier {
    pub const ALL: [RankTier; 5] = [
        RankTier::Basic,
        RankTier::Member,
        RankTier::Advanced,
        RankTier::Elite,
        RankTier::Master,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankTier::Basic => "Basic",
            RankTier::Member => "Member",
            RankTier::Advanced => "Advanced",
            RankTier::Elite => "Elite",
            RankTier::Master => "Master",
        }
    }
}

impl std::fmt::Display for RankTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Users ---

/// A Discord account's gamification state, as served by `GET /api/users/{discord_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub discord_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub xp: i64,
    pub level: u32,
    #[serde(default)]
    pub rank_tier: RankTier,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub unlocked_tools_count: u32,
    /// XP still required to reach the next level.
    #[serde(default)]
    pub next_level_xp: i64,
}

// --- Tools ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default = "default_tool_icon")]
    pub icon: String,
    pub required_level: u32,
    pub tier: RankTier,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

fn default_tool_icon() -> String {
    "🛠️".to_string()
}

fn default_enabled() -> bool {
    true
}

/// A tool joined with the requesting user's access to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolStatus {
    pub tool: Tool,
    pub is_unlocked: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::timestamp::deserialize_option"
    )]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_count: u32,
    /// Whether the user is eligible to unlock the tool right now.
    #[serde(default)]
    pub can_unlock: bool,
}

/// Body returned by `POST /api/tools/unlock/{discord_id}/{tool_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnlockResponse {
    pub message: String,
    #[serde(default)]
    pub already_unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

// --- Leaderboard ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position, dense over the returned page.
    pub rank: u32,
    pub user: User,
    pub xp: i64,
    pub level: u32,
}

/// Check that ranks start at 1 and increase by exactly one per entry.
pub fn is_dense_ranking(entries: &[LeaderboardEntry]) -> bool {
    entries
        .iter()
        .enumerate()
        .all(|(idx, entry)| entry.rank as usize == idx + 1)
}

// --- Service status ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_channel: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(discord_id: &str, xp: i64) -> User {
        User {
            id: format!("id-{discord_id}"),
            discord_id: discord_id.to_string(),
            username: format!("user{discord_id}"),
            avatar_url: None,
            xp,
            level: 1,
            rank_tier: RankTier::Basic,
            streak_days: 0,
            unlocked_tools_count: 0,
            next_level_xp: 0,
        }
    }

    #[test]
    fn user_decodes_backend_payload() {
        let json = r#"{
            "id": "0b8f",
            "discord_id": "123",
            "username": "TestUser",
            "avatar_url": null,
            "xp": 500,
            "level": 3,
            "rank_tier": "Basic",
            "streak_days": 5,
            "unlocked_tools_count": 2,
            "next_level_xp": 490
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.discord_id, "123");
        assert_eq!(user.level, 3);
        assert_eq!(user.next_level_xp, 490);
        assert_eq!(user.rank_tier, RankTier::Basic);
        assert!(user.avatar_url.is_none());
    }

    #[test]
    fn tool_fills_defaults() {
        let json = r#"{
            "id": "t1",
            "name": "Daily Rewards",
            "description": "Access to Daily Rewards",
            "required_level": 5,
            "tier": "Basic"
        }"#;

        let tool: Tool = serde_json::from_str(json).unwrap();
        assert!(tool.enabled);
        assert_eq!(tool.icon, "🛠️");
        assert!(tool.config.is_empty());
    }

    #[test]
    fn tool_status_accepts_offsetless_unlock_time() {
        let json = r#"{
            "tool": {
                "id": "basic-chat",
                "name": "Basic Chat",
                "description": "Access to Basic Chat",
                "required_level": 1,
                "tier": "Basic"
            },
            "is_unlocked": true,
            "unlocked_at": "2026-01-01T00:00:00.123456",
            "usage_count": 0,
            "can_unlock": false
        }"#;

        let status: ToolStatus = serde_json::from_str(json).unwrap();
        let unlocked_at = status.unlocked_at.unwrap();
        assert_eq!(unlocked_at.to_rfc3339(), "2026-01-01T00:00:00.123456+00:00");

        let missing = json.replace(r#""unlocked_at": "2026-01-01T00:00:00.123456","#, "");
        let status: ToolStatus = serde_json::from_str(&missing).unwrap();
        assert!(status.unlocked_at.is_none());
    }

    #[test]
    fn dense_ranking_detects_gaps() {
        let mut entries: Vec<LeaderboardEntry> = (1..=3)
            .map(|rank| LeaderboardEntry {
                rank,
                user: user(&rank.to_string(), 1000 - rank as i64),
                xp: 1000 - rank as i64,
                level: 1,
            })
            .collect();
        assert!(is_dense_ranking(&entries));
        assert!(is_dense_ranking(&[]));

        entries[2].rank = 4;
        assert!(!is_dense_ranking(&entries));
    }
}
