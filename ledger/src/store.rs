//! The ledger contract consumed by the recorder and the payout processor.

use crate::catalog::Catalog;
use crate::errors::LedgerResult;
use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use progression::Amount;
use serde::{Deserialize, Serialize};

/// Relative changes and absolute sets applied to a `UserStats` row in one
/// atomic update. `level` is always recomputed from the resulting XP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsUpdate {
    pub xp_delta: u64,
    pub lessons_delta: u32,
    pub earned_delta: Amount,
    pub streak: Option<u32>,
    pub last_check_in: Option<NaiveDate>,
    pub activity_at: Option<DateTime<Utc>>,
}

impl StatsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_xp(mut self, xp: u64) -> Self {
        self.xp_delta = self.xp_delta.saturating_add(xp);
        self
    }

    pub fn add_lessons(mut self, lessons: u32) -> Self {
        self.lessons_delta = self.lessons_delta.saturating_add(lessons);
        self
    }

    pub fn add_earned(mut self, amount: Amount) -> Self {
        self.earned_delta = self.earned_delta.saturating_add(amount);
        self
    }

    pub fn set_streak(mut self, streak: u32) -> Self {
        self.streak = Some(streak);
        self
    }

    pub fn set_last_check_in(mut self, date: NaiveDate) -> Self {
        self.last_check_in = Some(date);
        self
    }

    pub fn touch(mut self, at: DateTime<Utc>) -> Self {
        self.activity_at = Some(at);
        self
    }

    /// Apply to a snapshot. Counters saturate instead of wrapping.
    pub fn apply(&self, stats: &UserStats) -> UserStats {
        let mut next = stats.clone();
        next.xp = stats.xp.saturating_add(self.xp_delta);
        next.level = progression::level_from_xp(next.xp);
        next.lessons_completed = stats.lessons_completed.saturating_add(self.lessons_delta);
        next.total_earned = stats.total_earned.saturating_add(self.earned_delta);
        if let Some(streak) = self.streak {
            next.streak = streak;
        }
        if let Some(date) = self.last_check_in {
            next.last_check_in = Some(date);
        }
        if let Some(at) = self.activity_at {
            next.last_activity = Some(at);
        }
        next
    }
}

/// Stats before and after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsChange {
    pub before: UserStats,
    pub after: UserStats,
}

impl StatsChange {
    pub fn leveled_up(&self) -> bool {
        self.after.level > self.before.level
    }
}

/// One progress increment against a per-day target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTick {
    pub increment: u32,
    pub target: u32,
    pub at: DateTime<Utc>,
}

/// Result of a progress tick. `newly_completed` is true only for the call
/// that flipped `completed` from false to true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressAdvance<T> {
    pub row: T,
    pub newly_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTransition {
    Sent {
        hash: String,
        sent_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
        /// `None` marks the row as permanently failed.
        retry_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckin {
    pub user_address: String,
    pub date: NaiveDate,
    pub checked_in_at: DateTime<Utc>,
    pub reward_amount: Amount,
    pub consecutive_days: u32,
    pub xp_awarded: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRewardTransaction {
    pub user_address: String,
    pub reward_type: RewardType,
    pub reward_id: Option<String>,
    pub amount: Amount,
}

/// Per-user payout totals by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSummary {
    pub pending_count: u32,
    pub pending_amount: Amount,
    pub sent_count: u32,
    pub sent_amount: Amount,
    pub failed_count: u32,
    pub failed_amount: Amount,
    /// Failed rows still scheduled for another attempt.
    pub retrying_count: u32,
}

impl PayoutSummary {
    pub fn record(&mut self, tx: &RewardTransaction) {
        match tx.status {
            RewardStatus::Pending => {
                self.pending_count += 1;
                self.pending_amount = self.pending_amount.saturating_add(tx.amount);
            }
            RewardStatus::Sent => {
                self.sent_count += 1;
                self.sent_amount = self.sent_amount.saturating_add(tx.amount);
            }
            RewardStatus::Failed => {
                self.failed_count += 1;
                self.failed_amount = self.failed_amount.saturating_add(tx.amount);
                if tx.next_attempt_at.is_some() {
                    self.retrying_count += 1;
                }
            }
        }
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Users

    async fn get_or_create_user_stats(&self, user: &str) -> LedgerResult<UserStats>;

    async fn get_user_stats(&self, user: &str) -> LedgerResult<Option<UserStats>>;

    /// Optimistic compare-and-swap on the row version, retried a bounded
    /// number of times before failing with `Conflict`.
    async fn update_user_stats(&self, user: &str, update: StatsUpdate) -> LedgerResult<StatsChange>;

    // Catalog

    async fn list_lessons(&self) -> LedgerResult<Vec<Lesson>>;

    async fn get_lesson(&self, lesson_id: &str) -> LedgerResult<Option<Lesson>>;

    async fn count_lessons(&self) -> LedgerResult<u32>;

    async fn list_achievements(&self) -> LedgerResult<Vec<Achievement>>;

    async fn list_daily_challenges(&self) -> LedgerResult<Vec<DailyChallenge>>;

    async fn find_daily_challenge_by_type(&self, challenge_type: &str) -> LedgerResult<Option<DailyChallenge>>;

    async fn list_daily_tasks(&self) -> LedgerResult<Vec<DailyTask>>;

    async fn list_daily_tasks_by_type(&self, task_type: &str) -> LedgerResult<Vec<DailyTask>>;

    /// Upsert every catalog entry. Safe to run on every start.
    async fn seed_catalog(&self, catalog: &Catalog) -> LedgerResult<()>;

    // Lessons

    /// Fails with `DuplicateCompletion` if the user already completed the lesson.
    async fn create_lesson_progress(
        &self,
        user: &str,
        lesson_id: &str,
        xp_awarded: u64,
        completed_at: DateTime<Utc>,
    ) -> LedgerResult<LessonProgress>;

    async fn get_lesson_progress(&self, user: &str, lesson_id: &str) -> LedgerResult<Option<LessonProgress>>;

    /// Every lesson the user completed, oldest first.
    async fn list_lesson_progress(&self, user: &str) -> LedgerResult<Vec<LessonProgress>>;

    // Achievements

    async fn get_unlocked_achievements(&self, user: &str) -> LedgerResult<Vec<UserAchievement>>;

    /// Returns whether this call inserted the unlock.
    async fn unlock_achievement(
        &self,
        user: &str,
        achievement_id: &str,
        xp_awarded: u64,
        unlocked_at: DateTime<Utc>,
    ) -> LedgerResult<bool>;

    // Challenges

    async fn get_or_create_user_challenge(
        &self,
        user: &str,
        challenge_id: &str,
        date: NaiveDate,
        expires_at: DateTime<Utc>,
    ) -> LedgerResult<UserChallenge>;

    async fn update_user_challenge(&self, id: &str, tick: ProgressTick) -> LedgerResult<ProgressAdvance<UserChallenge>>;

    async fn list_user_challenges(&self, user: &str, date: NaiveDate) -> LedgerResult<Vec<UserChallenge>>;

    async fn count_completed_challenges(&self, user: &str) -> LedgerResult<u32>;

    // Legacy daily tasks

    async fn get_or_create_user_daily_task(&self, user: &str, task_id: &str, date: NaiveDate) -> LedgerResult<UserDailyTask>;

    async fn update_user_daily_task(&self, id: &str, tick: ProgressTick) -> LedgerResult<ProgressAdvance<UserDailyTask>>;

    async fn list_user_daily_tasks(&self, user: &str, date: NaiveDate) -> LedgerResult<Vec<UserDailyTask>>;

    // Check-ins

    async fn get_checkin(&self, user: &str, date: NaiveDate) -> LedgerResult<Option<DailyCheckin>>;

    /// Fails with `DuplicateCheckin` if one exists for the same day.
    async fn create_checkin(&self, checkin: NewCheckin) -> LedgerResult<DailyCheckin>;

    /// Check-in dates, ascending.
    async fn list_checkin_dates(&self, user: &str) -> LedgerResult<Vec<NaiveDate>>;

    // Reward transactions

    async fn create_reward_transaction(&self, tx: NewRewardTransaction) -> LedgerResult<RewardTransaction>;

    /// Refuses rows that are already `sent` with `InvalidTransition`.
    async fn update_reward_transaction(&self, id: &str, transition: StatusTransition) -> LedgerResult<RewardTransaction>;

    /// Pending rows plus failed rows due for retry at `now`, oldest first.
    async fn list_pending_reward_transactions(&self, now: DateTime<Utc>) -> LedgerResult<Vec<RewardTransaction>>;

    /// Newest first.
    async fn list_reward_transactions(&self, user: &str) -> LedgerResult<Vec<RewardTransaction>>;

    async fn payout_summary(&self, user: &str) -> LedgerResult<PayoutSummary>;

    /// Set the claim flag on the originating row if not already set.
    async fn mark_reward_claimed(&self, reward_type: RewardType, reward_id: &str, at: DateTime<Utc>) -> LedgerResult<bool>;

    /// Sent rows whose claim flag has not been confirmed yet.
    async fn list_unpropagated_claims(&self) -> LedgerResult<Vec<RewardTransaction>>;

    async fn mark_claim_propagated(&self, id: &str) -> LedgerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(xp: u64) -> UserStats {
        let now = Utc::now();
        UserStats {
            user_address: "0x01".into(),
            level: progression::level_from_xp(xp),
            xp,
            total_earned: Amount::ZERO,
            streak: 0,
            lessons_completed: 0,
            last_check_in: None,
            last_activity: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    #[test]
    fn apply_recomputes_level() {
        let before = stats(90);
        let after = StatsUpdate::new().add_xp(20).add_lessons(1).apply(&before);
        assert_eq!(after.xp, 110);
        assert_eq!(after.level, 2);
        assert_eq!(after.lessons_completed, 1);
        assert_eq!(after.streak, 0);

        let change = StatsChange { before, after };
        assert!(change.leveled_up());
    }

    #[test]
    fn sets_override_and_deltas_accumulate() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let update = StatsUpdate::new()
            .add_earned("0.011".parse().unwrap())
            .add_earned("0.001".parse().unwrap())
            .set_streak(4)
            .set_last_check_in(day);
        let after = update.apply(&stats(0));
        assert_eq!(after.total_earned.to_string(), "0.012");
        assert_eq!(after.streak, 4);
        assert_eq!(after.last_check_in, Some(day));
    }

    #[test]
    fn payout_summary_counts_retrying_failures() {
        let now = Utc::now();
        let mut tx = RewardTransaction {
            id: "a".into(),
            user_address: "0x01".into(),
            reward_type: RewardType::Checkin,
            reward_id: None,
            amount: "0.5".parse().unwrap(),
            status: RewardStatus::Failed,
            transaction_hash: None,
            attempts: 1,
            last_error: Some("insufficient balance".into()),
            next_attempt_at: Some(now),
            claim_propagated: false,
            created_at: now,
            sent_at: None,
        };
        let mut summary = PayoutSummary::default();
        summary.record(&tx);
        tx.next_attempt_at = None;
        summary.record(&tx);
        tx.status = RewardStatus::Pending;
        summary.record(&tx);

        assert_eq!(summary.failed_count, 2);
        assert_eq!(summary.retrying_count, 1);
        assert_eq!(summary.failed_amount.to_string(), "1");
        assert_eq!(summary.pending_count, 1);
    }
}
