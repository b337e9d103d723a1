//! Unlock state of a tool as shown to the user.
//!
//! The backend decides eligibility; the client only maps the flags it
//! receives onto three mutually exclusive states.

use xphub_shared::ToolStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockState {
    Unlocked,
    /// Eligible but not unlocked yet; the only state that offers an action.
    Available,
    Locked,
}

impl UnlockState {
    pub fn of(status: &ToolStatus) -> Self {
        if status.is_unlocked {
            UnlockState::Unlocked
        } else if status.can_unlock {
            UnlockState::Available
        } else {
            UnlockState::Locked
        }
    }

    /// Whether the unlock action is offered.
    pub fn can_unlock(&self) -> bool {
        matches!(self, UnlockState::Available)
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnlockState::Unlocked => "Unlocked",
            UnlockState::Available => "Available",
            UnlockState::Locked => "Locked",
        }
    }
}

impl std::fmt::Display for UnlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xphub_shared::{RankTier, Tool};

    fn status(is_unlocked: bool, can_unlock: bool) -> ToolStatus {
        ToolStatus {
            tool: Tool {
                id: "t".to_string(),
                name: "Voice Channels".to_string(),
                description: "Access to Voice Channels".to_string(),
                icon: "🎤".to_string(),
                required_level: 11,
                tier: RankTier::Member,
                enabled: true,
                config: Default::default(),
            },
            is_unlocked,
            unlocked_at: None,
            usage_count: 0,
            can_unlock,
        }
    }

    #[test]
    fn three_states() {
        assert_eq!(UnlockState::of(&status(true, false)), UnlockState::Unlocked);
        assert_eq!(UnlockState::of(&status(false, true)), UnlockState::Available);
        assert_eq!(UnlockState::of(&status(false, false)), UnlockState::Locked);
    }

    #[test]
    fn unlocked_wins_over_stale_eligibility() {
        assert_eq!(UnlockState::of(&status(true, true)), UnlockState::Unlocked);
    }

    #[test]
    fn only_available_offers_action() {
        assert!(UnlockState::Available.can_unlock());
        assert!(!UnlockState::Unlocked.can_unlock());
        assert!(!UnlockState::Locked.can_unlock());
        assert_eq!(UnlockState::Locked.to_string(), "Locked");
    }
}
