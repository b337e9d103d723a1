//! Push-channel protocol shared by the event bridge and the development server.
//!
//! Every frame is a [`WsEnvelope`] whose payload is flattened next to the
//! envelope fields, so a level-up frame looks like:
//!
//! ```json
//! {"id": "3f1c…", "event": "level_up", "data": {"discord_id": "123", …}, "ts": "2026-…Z"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::RankTier;

/// Path the push channel is served on.
pub const WS_PATH: &str = "/ws";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEnvelope<T> {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub payload: T,
    #[serde(default = "Utc::now", deserialize_with = "crate::timestamp::deserialize")]
    pub ts: DateTime<Utc>,
}

impl<T> WsEnvelope<T> {
    pub fn new(id: impl Into<String>, payload: T) -> Self {
        Self {
            id: id.into(),
            payload,
            ts: Utc::now(),
        }
    }
}

/// Commands a client may send over the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Liveness check carrying the client's clock in milliseconds since the epoch.
    Ping { timestamp: i64 },
}

/// Events the backend pushes to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ConnectionEstablished { sid: String },
    LevelUp(LevelUpEvent),
    ToolUnlocked(ToolUnlockedEvent),
    Pong { timestamp: Option<i64> },
}

/// Discriminant of [`ServerEvent`], used to key handler lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConnectionEstablished,
    LevelUp,
    ToolUnlocked,
    Pong,
}

impl EventKind {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ConnectionEstablished => "connection_established",
            EventKind::LevelUp => "level_up",
            EventKind::ToolUnlocked => "tool_unlocked",
            EventKind::Pong => "pong",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "connection_established" => Some(EventKind::ConnectionEstablished),
            "level_up" => Some(EventKind::LevelUp),
            "tool_unlocked" => Some(EventKind::ToolUnlocked),
            "pong" => Some(EventKind::Pong),
            _ => None,
        }
    }
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::ConnectionEstablished { .. } => EventKind::ConnectionEstablished,
            ServerEvent::LevelUp(_) => EventKind::LevelUp,
            ServerEvent::ToolUnlocked(_) => EventKind::ToolUnlocked,
            ServerEvent::Pong { .. } => EventKind::Pong,
        }
    }

    /// Discord identity the event concerns, if any.
    pub fn discord_id(&self) -> Option<&str> {
        match self {
            ServerEvent::LevelUp(event) => Some(&event.discord_id),
            ServerEvent::ToolUnlocked(event) => Some(&event.discord_id),
            ServerEvent::ConnectionEstablished { .. } | ServerEvent::Pong { .. } => None,
        }
    }
}

/// Only `discord_id` is required; everything else is informational and
/// decoded leniently so a level-up is never dropped over a detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelUpEvent {
    pub discord_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub old_level: u32,
    #[serde(default)]
    pub new_level: u32,
    #[serde(default, deserialize_with = "lenient_tier")]
    pub new_tier: Option<RankTier>,
    /// Names of tools that became eligible with this level.
    #[serde(default)]
    pub unlocked_tools: Vec<String>,
    #[serde(default, deserialize_with = "crate::timestamp::deserialize_option")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUnlockedEvent {
    pub discord_id: String,
    #[serde(default)]
    pub tool_id: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default, deserialize_with = "crate::timestamp::deserialize_option")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// An unknown tier name reads as `None`.
fn lenient_tier<'de, D>(deserializer: D) -> Result<Option<RankTier>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| RankTier::deserialize(value).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_up_frame_shape() {
        let frame = WsEnvelope::new(
            "f1",
            ServerEvent::LevelUp(LevelUpEvent {
                discord_id: "123".to_string(),
                username: "TestUser".to_string(),
                old_level: 2,
                new_level: 3,
                new_tier: Some(RankTier::Basic),
                unlocked_tools: vec!["Daily Rewards".to_string()],
                timestamp: Some(Utc::now()),
            }),
        );

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["id"], "f1");
        assert_eq!(value["event"], "level_up");
        assert_eq!(value["data"]["discord_id"], "123");
        assert_eq!(value["data"]["new_tier"], "Basic");
    }

    #[test]
    fn decodes_connection_established() {
        let json = r#"{"id":"a","event":"connection_established","data":{"sid":"s-1"},"ts":"2026-01-01T00:00:00Z"}"#;
        let frame: WsEnvelope<ServerEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(
            frame.payload,
            ServerEvent::ConnectionEstablished {
                sid: "s-1".to_string()
            }
        );
        assert_eq!(frame.payload.kind(), EventKind::ConnectionEstablished);
        assert!(frame.payload.discord_id().is_none());
    }

    #[test]
    fn unknown_event_is_rejected() {
        let json = r#"{"id":"a","event":"xp_gained","data":{},"ts":"2026-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<WsEnvelope<ServerEvent>>(json).is_err());
    }

    #[test]
    fn ping_uses_event_tag() {
        let value = serde_json::to_value(ClientCommand::Ping { timestamp: 42 }).unwrap();
        assert_eq!(value["event"], "ping");
        assert_eq!(value["data"]["timestamp"], 42);
    }

    #[test]
    fn kind_names_match_wire_tags() {
        let event = ServerEvent::ToolUnlocked(ToolUnlockedEvent {
            discord_id: "9".to_string(),
            tool_id: "t".to_string(),
            tool_name: "Voice Channels".to_string(),
            timestamp: Some(Utc::now()),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], event.kind().name());
        assert_eq!(event.discord_id(), Some("9"));
    }

    #[test]
    fn level_up_with_offsetless_timestamp() {
        let json = r#"{"id":"a","event":"level_up","data":{"discord_id":"123","username":"TestUser","old_level":2,"new_level":3,"new_tier":"Basic","unlocked_tools":[],"timestamp":"2026-01-01T00:00:00.123456"},"ts":"2026-01-01T00:00:00.123456"}"#;
        let frame: WsEnvelope<ServerEvent> = serde_json::from_str(json).unwrap();
        let ServerEvent::LevelUp(event) = frame.payload else {
            panic!("expected level_up, got {:?}", frame.payload);
        };
        assert_eq!(event.new_level, 3);
        assert!(event.timestamp.is_some());
    }

    #[test]
    fn level_up_needs_only_discord_id() {
        let json = r#"{"event":"level_up","data":{"discord_id":"123","new_level":3,"new_tier":"Legend","timestamp":12}}"#;
        let frame: WsEnvelope<ServerEvent> = serde_json::from_str(json).unwrap();
        let ServerEvent::LevelUp(event) = frame.payload else {
            panic!("expected level_up, got {:?}", frame.payload);
        };
        assert_eq!(event.discord_id, "123");
        assert_eq!(event.new_level, 3);
        assert_eq!(event.username, "");
        assert_eq!(event.new_tier, None);
        assert_eq!(event.timestamp, None);
        assert!(frame.id.is_empty());
    }

    #[test]
    fn tool_unlocked_needs_only_discord_id() {
        let json = r#"{"event":"tool_unlocked","data":{"discord_id":"42"}}"#;
        let frame: WsEnvelope<ServerEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(frame.payload.kind(), EventKind::ToolUnlocked);
        assert_eq!(frame.payload.discord_id(), Some("42"));

        let missing_id = r#"{"event":"tool_unlocked","data":{"tool_id":"basic-chat"}}"#;
        assert!(serde_json::from_str::<WsEnvelope<ServerEvent>>(missing_id).is_err());
    }

    #[test]
    fn kind_from_name_round_trips() {
        for kind in [
            EventKind::ConnectionEstablished,
            EventKind::LevelUp,
            EventKind::ToolUnlocked,
            EventKind::Pong,
        ] {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("xp_gained"), None);
    }
}
