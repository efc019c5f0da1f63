//! Reward schedules for lessons and daily check-ins.

use crate::amount::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl LessonDifficulty {
    pub fn xp_reward(&self) -> u64 {
        match self {
            LessonDifficulty::Beginner => 50,
            LessonDifficulty::Intermediate => 75,
            LessonDifficulty::Advanced => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LessonDifficulty::Beginner => "beginner",
            LessonDifficulty::Intermediate => "intermediate",
            LessonDifficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for LessonDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(LessonDifficulty::Beginner),
            "intermediate" => Ok(LessonDifficulty::Intermediate),
            "advanced" => Ok(LessonDifficulty::Advanced),
            other => Err(format!("unknown lesson difficulty: {}", other)),
        }
    }
}

/// Token and XP payout for a daily check-in as a function of the streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinPolicy {
    pub base_reward: Amount,
    pub streak_increment: Amount,
    pub base_xp: u64,
    pub xp_per_day: u64,
    pub max_xp: u64,
}

impl CheckinPolicy {
    /// `base_reward + streak * streak_increment`
    pub fn reward(&self, streak: u32) -> Amount {
        self.streak_increment
            .checked_mul(streak as u64)
            .and_then(|bonus| self.base_reward.checked_add(bonus))
            .unwrap_or(Amount::from_wei(u128::MAX))
    }

    /// `min(base_xp + streak * xp_per_day, max_xp)`
    pub fn xp(&self, streak: u32) -> u64 {
        self.base_xp
            .saturating_add((streak as u64).saturating_mul(self.xp_per_day))
            .min(self.max_xp)
    }
}

impl Default for CheckinPolicy {
    fn default() -> Self {
        Self {
            base_reward: Amount::from_wei(10_000_000_000_000_000), // 0.01
            streak_increment: Amount::from_wei(1_000_000_000_000_000), // 0.001
            base_xp: 10,
            xp_per_day: 2,
            max_xp: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_xp_tiers() {
        assert_eq!(LessonDifficulty::Beginner.xp_reward(), 50);
        assert_eq!(LessonDifficulty::Intermediate.xp_reward(), 75);
        assert_eq!(LessonDifficulty::Advanced.xp_reward(), 100);
        assert_eq!("advanced".parse::<LessonDifficulty>(), Ok(LessonDifficulty::Advanced));
        assert!("expert".parse::<LessonDifficulty>().is_err());
    }

    #[test]
    fn checkin_reward_grows_with_streak() {
        let policy = CheckinPolicy::default();
        assert_eq!(policy.reward(1).to_string(), "0.011");
        assert_eq!(policy.reward(3).to_string(), "0.013");
        assert_eq!(policy.reward(30).to_string(), "0.04");
    }

    #[test]
    fn checkin_xp_is_capped() {
        let policy = CheckinPolicy::default();
        assert_eq!(policy.xp(1), 12);
        assert_eq!(policy.xp(10), 30);
        assert_eq!(policy.xp(25), 60);
        assert_eq!(policy.xp(400), 60);
    }

    #[test]
    fn partial_policy_config_uses_defaults() {
        let policy: CheckinPolicy = serde_json::from_str(r#"{"max_xp": 20}"#).unwrap();
        assert_eq!(policy.max_xp, 20);
        assert_eq!(policy.base_xp, 10);
        assert_eq!(policy.xp(7), 20);
    }
}
