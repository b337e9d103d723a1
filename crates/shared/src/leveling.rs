//! Level curve, tier table and progress-bar math.
//!
//! The backend owns XP awarding; these helpers only reproduce its curve so the
//! client can draw progress and the development server can fill in derived
//! fields.

use crate::models::{RankTier, User};

const BASE_XP: i64 = 100;
const COEFFICIENT: i64 = 50;

/// Total XP needed to reach `level`: `100·level² + 50·level`.
pub fn xp_for_level(level: u32) -> i64 {
    let level = i64::from(level);
    BASE_XP * level * level + COEFFICIENT * level
}

/// Level reached with `xp` total experience, never below 1.
pub fn level_from_xp(xp: i64) -> u32 {
    if xp <= 0 {
        return 1;
    }
    // Positive root of BASE·l² + COEF·l - xp = 0.
    let a = BASE_XP as f64;
    let b = COEFFICIENT as f64;
    let discriminant = b * b + 4.0 * a * xp as f64;
    let mut level = ((-b + discriminant.sqrt()) / (2.0 * a)).floor() as u32;
    // Float rounding can land one off at exact thresholds.
    while xp_for_level(level + 1) <= xp {
        level += 1;
    }
    while level > 0 && xp_for_level(level) > xp {
        level -= 1;
    }
    level.max(1)
}

/// XP still missing before `current_level + 1`.
pub fn xp_to_next_level(current_xp: i64, current_level: u32) -> i64 {
    xp_for_level(current_level + 1) - current_xp
}

pub fn tier_for_level(level: u32) -> RankTier {
    match level {
        0..=10 => RankTier::Basic,
        11..=25 => RankTier::Member,
        26..=50 => RankTier::Advanced,
        51..=75 => RankTier::Elite,
        _ => RankTier::Master,
    }
}

/// Progress of a user through their current level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelProgress {
    pub level: u32,
    /// XP earned since the current level's threshold. Negative when the
    /// backend reports a level ahead of the XP total.
    pub xp_in_level: i64,
    /// XP between the current and the next level threshold.
    pub xp_span: i64,
    /// Unclamped percentage through the level.
    pub percent: f64,
}

impl LevelProgress {
    pub fn of(user: &User) -> Self {
        Self::from_parts(user.xp, user.level)
    }

    pub fn from_parts(xp: i64, level: u32) -> Self {
        let current = xp_for_level(level);
        let next = xp_for_level(level + 1);
        let xp_in_level = xp - current;
        let xp_span = next - current;
        let percent = if xp_span > 0 {
            xp_in_level as f64 / xp_span as f64 * 100.0
        } else {
            0.0
        };

        Self {
            level,
            xp_in_level,
            xp_span,
            percent,
        }
    }

    /// Percentage to draw, clamped to `0.0..=100.0`.
    pub fn bar_percent(&self) -> f64 {
        self.percent.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_values() {
        assert_eq!(xp_for_level(1), 150);
        assert_eq!(xp_for_level(2), 500);
        assert_eq!(xp_for_level(3), 1050);
        assert_eq!(xp_to_next_level(500, 2), 550);
    }

    #[test]
    fn level_inverts_curve() {
        assert_eq!(level_from_xp(0), 1);
        assert_eq!(level_from_xp(-5), 1);
        assert_eq!(level_from_xp(499), 1);
        assert_eq!(level_from_xp(500), 2);
        assert_eq!(level_from_xp(1049), 2);
        assert_eq!(level_from_xp(1050), 3);
        for level in 1..200 {
            assert_eq!(level_from_xp(xp_for_level(level)), level);
        }
    }

    #[test]
    fn tiers() {
        assert_eq!(tier_for_level(1), RankTier::Basic);
        assert_eq!(tier_for_level(10), RankTier::Basic);
        assert_eq!(tier_for_level(11), RankTier::Member);
        assert_eq!(tier_for_level(26), RankTier::Advanced);
        assert_eq!(tier_for_level(75), RankTier::Elite);
        assert_eq!(tier_for_level(76), RankTier::Master);
        assert_eq!(tier_for_level(400), RankTier::Master);
    }

    #[test]
    fn progress_midway() {
        // Level 2 spans 500..1050.
        let progress = LevelProgress::from_parts(775, 2);
        assert_eq!(progress.xp_in_level, 275);
        assert_eq!(progress.xp_span, 550);
        assert!((progress.percent - 50.0).abs() < 1e-9);
        assert!((progress.bar_percent() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn progress_bar_is_clamped() {
        // Backend says level 3 but the XP total is below its threshold.
        let progress = LevelProgress::from_parts(500, 3);
        assert!(progress.percent < 0.0);
        assert_eq!(progress.bar_percent(), 0.0);

        let progress = LevelProgress::from_parts(10_000, 1);
        assert!(progress.percent > 100.0);
        assert_eq!(progress.bar_percent(), 100.0);
    }
}
