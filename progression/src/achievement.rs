//! Achievement requirements and their evaluation.

use serde::{Deserialize, Serialize};

/// Unlock condition of an achievement.
///
/// Persisted as `{"type": "lessons_completed", "value": 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Requirement {
    #[serde(rename = "lessons_completed")]
    LessonsCompletedAtLeast(u32),
    #[serde(rename = "daily_streak")]
    DailyStreakAtLeast(u32),
    #[serde(rename = "level_reached")]
    LevelAtLeast(u32),
    #[serde(rename = "all_lessons_completed")]
    AllLessonsCompleted,
    #[serde(rename = "challenges_completed")]
    ChallengesCompletedAtLeast(u32),
}

/// The user state a requirement is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub lessons_completed: u32,
    pub streak: u32,
    pub level: u32,
    /// Size of the active lesson catalog.
    pub total_lessons: u32,
    pub challenges_completed: u32,
}

pub fn evaluate_achievement(requirement: &Requirement, snapshot: &ProgressSnapshot) -> bool {
    match *requirement {
        Requirement::LessonsCompletedAtLeast(n) => snapshot.lessons_completed >= n,
        Requirement::DailyStreakAtLeast(n) => snapshot.streak >= n,
        Requirement::LevelAtLeast(n) => snapshot.level >= n,
        Requirement::AllLessonsCompleted => {
            snapshot.total_lessons > 0 && snapshot.lessons_completed >= snapshot.total_lessons
        }
        Requirement::ChallengesCompletedAtLeast(n) => snapshot.challenges_completed >= n,
    }
}
