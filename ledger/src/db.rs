//! SQLite-backed ledger.

use crate::catalog::Catalog;
use crate::errors::LedgerResult;
use crate::models::*;
use crate::queries::*;
use crate::schema::{CREATE_INDEXES, CREATE_TABLES};
use crate::store::*;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub async fn open(database_path: &Path) -> LedgerResult<Self> {
        // Ensure the database directory exists
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        info!("Opened ledger database at {}", database_path.display());
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> LedgerResult<()> {
        for statement in CREATE_TABLES.iter().chain(CREATE_INDEXES.iter()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn get_or_create_user_stats(&self, user: &str) -> LedgerResult<UserStats> {
        UserQueries::get_or_create(&self.pool, user).await
    }

    async fn get_user_stats(&self, user: &str) -> LedgerResult<Option<UserStats>> {
        UserQueries::get(&self.pool, user).await
    }

    async fn update_user_stats(&self, user: &str, update: StatsUpdate) -> LedgerResult<StatsChange> {
        UserQueries::update(&self.pool, user, &update).await
    }

    async fn list_lessons(&self) -> LedgerResult<Vec<Lesson>> {
        CatalogQueries::list_lessons(&self.pool).await
    }

    async fn get_lesson(&self, lesson_id: &str) -> LedgerResult<Option<Lesson>> {
        CatalogQueries::get_lesson(&self.pool, lesson_id).await
    }

    async fn count_lessons(&self) -> LedgerResult<u32> {
        CatalogQueries::count_lessons(&self.pool).await
    }

    async fn list_achievements(&self) -> LedgerResult<Vec<Achievement>> {
        CatalogQueries::list_achievements(&self.pool).await
    }

    async fn list_daily_challenges(&self) -> LedgerResult<Vec<DailyChallenge>> {
        CatalogQueries::list_daily_challenges(&self.pool).await
    }

    async fn find_daily_challenge_by_type(&self, challenge_type: &str) -> LedgerResult<Option<DailyChallenge>> {
        CatalogQueries::find_daily_challenge_by_type(&self.pool, challenge_type).await
    }

    async fn list_daily_tasks(&self) -> LedgerResult<Vec<DailyTask>> {
        CatalogQueries::list_daily_tasks(&self.pool).await
    }

    async fn list_daily_tasks_by_type(&self, task_type: &str) -> LedgerResult<Vec<DailyTask>> {
        CatalogQueries::list_daily_tasks_by_type(&self.pool, task_type).await
    }

    async fn seed_catalog(&self, catalog: &Catalog) -> LedgerResult<()> {
        CatalogQueries::seed(&self.pool, catalog).await
    }

    async fn create_lesson_progress(
        &self,
        user: &str,
        lesson_id: &str,
        xp_awarded: u64,
        completed_at: DateTime<Utc>,
    ) -> LedgerResult<LessonProgress> {
        LessonQueries::create_progress(&self.pool, user, lesson_id, xp_awarded, completed_at).await
    }

    async fn get_lesson_progress(&self, user: &str, lesson_id: &str) -> LedgerResult<Option<LessonProgress>> {
        LessonQueries::get_progress(&self.pool, user, lesson_id).await
    }

    async fn list_lesson_progress(&self, user: &str) -> LedgerResult<Vec<LessonProgress>> {
        LessonQueries::list_progress(&self.pool, user).await
    }

    async fn get_unlocked_achievements(&self, user: &str) -> LedgerResult<Vec<UserAchievement>> {
        AchievementQueries::list_unlocked(&self.pool, user).await
    }

    async fn unlock_achievement(
        &self,
        user: &str,
        achievement_id: &str,
        xp_awarded: u64,
        unlocked_at: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        AchievementQueries::unlock(&self.pool, user, achievement_id, xp_awarded, unlocked_at).await
    }

    async fn get_or_create_user_challenge(
        &self,
        user: &str,
        challenge_id: &str,
        date: NaiveDate,
        expires_at: DateTime<Utc>,
    ) -> LedgerResult<UserChallenge> {
        ChallengeQueries::get_or_create(&self.pool, user, challenge_id, date, expires_at).await
    }

    async fn update_user_challenge(&self, id: &str, tick: ProgressTick) -> LedgerResult<ProgressAdvance<UserChallenge>> {
        ChallengeQueries::advance(&self.pool, id, tick).await
    }

    async fn list_user_challenges(&self, user: &str, date: NaiveDate) -> LedgerResult<Vec<UserChallenge>> {
        ChallengeQueries::list_for_day(&self.pool, user, date).await
    }

    async fn count_completed_challenges(&self, user: &str) -> LedgerResult<u32> {
        ChallengeQueries::count_completed(&self.pool, user).await
    }

    async fn get_or_create_user_daily_task(&self, user: &str, task_id: &str, date: NaiveDate) -> LedgerResult<UserDailyTask> {
        TaskQueries::get_or_create(&self.pool, user, task_id, date).await
    }

    async fn update_user_daily_task(&self, id: &str, tick: ProgressTick) -> LedgerResult<ProgressAdvance<UserDailyTask>> {
        TaskQueries::advance(&self.pool, id, tick).await
    }

    async fn list_user_daily_tasks(&self, user: &str, date: NaiveDate) -> LedgerResult<Vec<UserDailyTask>> {
        TaskQueries::list_for_day(&self.pool, user, date).await
    }

    async fn get_checkin(&self, user: &str, date: NaiveDate) -> LedgerResult<Option<DailyCheckin>> {
        CheckinQueries::get(&self.pool, user, date).await
    }

    async fn create_checkin(&self, checkin: NewCheckin) -> LedgerResult<DailyCheckin> {
        CheckinQueries::create(&self.pool, &checkin).await
    }

    async fn list_checkin_dates(&self, user: &str) -> LedgerResult<Vec<NaiveDate>> {
        CheckinQueries::list_dates(&self.pool, user).await
    }

    async fn create_reward_transaction(&self, tx: NewRewardTransaction) -> LedgerResult<RewardTransaction> {
        RewardQueries::create(&self.pool, &tx).await
    }

    async fn update_reward_transaction(&self, id: &str, transition: StatusTransition) -> LedgerResult<RewardTransaction> {
        RewardQueries::transition(&self.pool, id, &transition).await
    }

    async fn list_pending_reward_transactions(&self, now: DateTime<Utc>) -> LedgerResult<Vec<RewardTransaction>> {
        RewardQueries::list_due(&self.pool, now).await
    }

    async fn list_reward_transactions(&self, user: &str) -> LedgerResult<Vec<RewardTransaction>> {
        RewardQueries::list_for_user(&self.pool, user).await
    }

    async fn payout_summary(&self, user: &str) -> LedgerResult<PayoutSummary> {
        RewardQueries::summary(&self.pool, user).await
    }

    async fn mark_reward_claimed(&self, reward_type: RewardType, reward_id: &str, at: DateTime<Utc>) -> LedgerResult<bool> {
        RewardQueries::mark_claimed(&self.pool, reward_type, reward_id, at).await
    }

    async fn list_unpropagated_claims(&self) -> LedgerResult<Vec<RewardTransaction>> {
        RewardQueries::list_unpropagated(&self.pool).await
    }

    async fn mark_claim_propagated(&self, id: &str) -> LedgerResult<()> {
        RewardQueries::mark_propagated(&self.pool, id).await
    }
}
