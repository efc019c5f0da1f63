//! Catalog content: lessons, achievements, daily challenges and legacy tasks.

use crate::models::{Achievement, DailyChallenge, DailyTask, Lesson};
use progression::{Amount, LessonDifficulty, Requirement};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub lessons: Vec<Lesson>,
    pub achievements: Vec<Achievement>,
    pub daily_challenges: Vec<DailyChallenge>,
    pub daily_tasks: Vec<DailyTask>,
}

fn lesson(id: &str, title: &str, description: &str, difficulty: LessonDifficulty, category: &str) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        difficulty,
        category: category.to_string(),
        reward_amount: Amount::from_tokens(10),
        is_active: true,
    }
}

fn achievement(
    id: &str,
    title: &str,
    description: &str,
    icon: &str,
    reward_xp: u64,
    requirement: Requirement,
) -> Achievement {
    Achievement {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        requirement,
        reward_xp,
        is_active: true,
    }
}

fn challenge(
    id: &str,
    title: &str,
    description: &str,
    challenge_type: &str,
    reward_tokens: u64,
    xp_reward: u64,
    target: u32,
) -> DailyChallenge {
    DailyChallenge {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        challenge_type: challenge_type.to_string(),
        reward_amount: Amount::from_tokens(reward_tokens),
        xp_reward,
        target,
        is_active: true,
    }
}

fn task(id: &str, title: &str, description: &str, task_type: &str, reward_tokens: u64, target_value: u32) -> DailyTask {
    DailyTask {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        task_type: task_type.to_string(),
        reward_amount: Amount::from_tokens(reward_tokens),
        target_value,
        is_active: true,
    }
}

impl Catalog {
    /// The catalog the daemon seeds on startup.
    pub fn standard() -> Self {
        use LessonDifficulty::*;

        let lessons = vec![
            lesson(
                "intro-crypto",
                "What is Cryptocurrency?",
                "Learn the basics of digital currency and blockchain",
                Beginner,
                "basics",
            ),
            lesson(
                "paxeer-network",
                "Understanding Paxeer Network",
                "Discover what makes Paxeer special in the crypto world",
                Beginner,
                "paxeer",
            ),
            lesson(
                "defi-basics",
                "DeFi Fundamentals",
                "Learn about Decentralized Finance and its benefits",
                Intermediate,
                "defi",
            ),
            lesson(
                "wallet-security",
                "Keeping Your Crypto Safe",
                "Essential security practices for crypto users",
                Beginner,
                "security",
            ),
            lesson(
                "trading-basics",
                "Smart Trading Strategies",
                "Learn fundamental trading concepts and risk management",
                Intermediate,
                "trading",
            ),
            lesson(
                "yield-farming",
                "Earning with Yield Farming",
                "Understand how to earn passive income in DeFi",
                Advanced,
                "defi",
            ),
        ];

        let achievements = vec![
            achievement(
                "first_lesson",
                "First Steps",
                "Complete your first lesson",
                "🎓",
                50,
                Requirement::LessonsCompletedAtLeast(1),
            ),
            achievement(
                "lesson_master",
                "Lesson Master",
                "Complete 10 lessons",
                "📚",
                200,
                Requirement::LessonsCompletedAtLeast(10),
            ),
            achievement(
                "streak_starter",
                "Streak Starter",
                "Maintain a 3-day check-in streak",
                "🔥",
                100,
                Requirement::DailyStreakAtLeast(3),
            ),
            achievement(
                "dedicated_learner",
                "Dedicated Learner",
                "Maintain a 7-day check-in streak",
                "💪",
                300,
                Requirement::DailyStreakAtLeast(7),
            ),
            achievement(
                "crypto_guru",
                "Crypto Guru",
                "Complete all available lessons",
                "🧙‍♂️",
                500,
                Requirement::AllLessonsCompleted,
            ),
            achievement(
                "level_up",
                "Level Up",
                "Reach level 5",
                "⭐",
                250,
                Requirement::LevelAtLeast(5),
            ),
            achievement(
                "challenge_champion",
                "Challenge Champion",
                "Complete 5 daily challenges",
                "🏆",
                150,
                Requirement::ChallengesCompletedAtLeast(5),
            ),
        ];

        let daily_challenges = vec![
            challenge("daily_checkin", "Daily Check-in", "Check in to the app today", "daily_checkin", 1, 10, 1),
            challenge("complete_lesson", "Learn Something New", "Complete a lesson today", "lesson", 5, 25, 1),
            challenge("swap_tokens", "Trade Smart", "Make a token swap today", "swap", 3, 20, 1),
            challenge(
                "check_portfolio",
                "Portfolio Review",
                "Check your portfolio balance",
                "portfolio_view",
                2,
                15,
                1,
            ),
        ];

        let daily_tasks = vec![
            task("daily-trader", "Daily Trader", "Complete 1 swap today", "swap", 5, 1),
            task("lesson-learner", "Lesson Learner", "Complete 2 lessons today", "lesson", 8, 2),
            task("explorer", "Portfolio Explorer", "Check your portfolio 3 times today", "portfolio_view", 3, 3),
        ];

        Self {
            lessons,
            achievements,
            daily_challenges,
            daily_tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn standard_catalog_shape() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.lessons.len(), 6);
        assert_eq!(catalog.achievements.len(), 7);
        assert_eq!(catalog.daily_challenges.len(), 4);

        let types: HashSet<_> = catalog
            .daily_challenges
            .iter()
            .map(|c| c.challenge_type.as_str())
            .collect();
        assert!(types.contains("daily_checkin"));
        assert!(types.contains("lesson"));
    }

    #[test]
    fn ids_are_unique() {
        let catalog = Catalog::standard();
        let lesson_ids: HashSet<_> = catalog.lessons.iter().map(|l| &l.id).collect();
        assert_eq!(lesson_ids.len(), catalog.lessons.len());
        let achievement_ids: HashSet<_> = catalog.achievements.iter().map(|a| &a.id).collect();
        assert_eq!(achievement_ids.len(), catalog.achievements.len());
    }
}
