use super::to_i64;
use crate::errors::{is_unique_violation, LedgerError, LedgerResult};
use crate::models::{DailyCheckin, LessonProgress, UserAchievement, UserChallenge, UserDailyTask};
use crate::store::{NewCheckin, ProgressAdvance, ProgressTick};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct LessonQueries;

impl LessonQueries {
    pub async fn create_progress(
        pool: &SqlitePool,
        user: &str,
        lesson_id: &str,
        xp_awarded: u64,
        completed_at: DateTime<Utc>,
    ) -> LedgerResult<LessonProgress> {
        let id = Uuid::new_v4().to_string();
        let inserted = sqlx::query(
            r#"
            INSERT INTO lesson_progress (id, user_address, lesson_id, completed_at, xp_awarded)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user)
        .bind(lesson_id)
        .bind(completed_at)
        .bind(to_i64(xp_awarded, "xp_awarded")?)
        .execute(pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(LedgerError::DuplicateCompletion {
                    user: user.to_string(),
                    lesson: lesson_id.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        }

        Self::get_progress(pool, user, lesson_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("lesson progress {}", id)))
    }

    pub async fn get_progress(pool: &SqlitePool, user: &str, lesson_id: &str) -> LedgerResult<Option<LessonProgress>> {
        let progress = sqlx::query_as::<_, LessonProgress>(
            "SELECT * FROM lesson_progress WHERE user_address = ? AND lesson_id = ?",
        )
        .bind(user)
        .bind(lesson_id)
        .fetch_optional(pool)
        .await?;

        Ok(progress)
    }

    pub async fn list_progress(pool: &SqlitePool, user: &str) -> LedgerResult<Vec<LessonProgress>> {
        let progress = sqlx::query_as::<_, LessonProgress>(
            "SELECT * FROM lesson_progress WHERE user_address = ? ORDER BY completed_at, lesson_id",
        )
        .bind(user)
        .fetch_all(pool)
        .await?;

        Ok(progress)
    }
}

pub struct AchievementQueries;

impl AchievementQueries {
    pub async fn list_unlocked(pool: &SqlitePool, user: &str) -> LedgerResult<Vec<UserAchievement>> {
        let unlocked = sqlx::query_as::<_, UserAchievement>(
            "SELECT * FROM user_achievements WHERE user_address = ? ORDER BY unlocked_at, achievement_id",
        )
        .bind(user)
        .fetch_all(pool)
        .await?;

        Ok(unlocked)
    }

    pub async fn unlock(
        pool: &SqlitePool,
        user: &str,
        achievement_id: &str,
        xp_awarded: u64,
        unlocked_at: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_achievements (id, user_address, achievement_id, unlocked_at, xp_awarded)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_address, achievement_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user)
        .bind(achievement_id)
        .bind(unlocked_at)
        .bind(to_i64(xp_awarded, "xp_awarded")?)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

pub struct ChallengeQueries;

impl ChallengeQueries {
    pub async fn get_or_create(
        pool: &SqlitePool,
        user: &str,
        challenge_id: &str,
        date: NaiveDate,
        expires_at: DateTime<Utc>,
    ) -> LedgerResult<UserChallenge> {
        sqlx::query(
            r#"
            INSERT INTO user_challenges (id, user_address, challenge_id, date, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_address, challenge_id, date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user)
        .bind(challenge_id)
        .bind(date)
        .bind(expires_at)
        .execute(pool)
        .await?;

        let row = sqlx::query_as::<_, UserChallenge>(
            "SELECT * FROM user_challenges WHERE user_address = ? AND challenge_id = ? AND date = ?",
        )
        .bind(user)
        .bind(challenge_id)
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> LedgerResult<UserChallenge> {
        sqlx::query_as::<_, UserChallenge>("SELECT * FROM user_challenges WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user challenge {}", id)))
    }

    pub async fn advance(pool: &SqlitePool, id: &str, tick: ProgressTick) -> LedgerResult<ProgressAdvance<UserChallenge>> {
        // Completed rows stop counting.
        sqlx::query("UPDATE user_challenges SET progress = progress + ? WHERE id = ? AND completed = 0")
            .bind(tick.increment as i64)
            .bind(id)
            .execute(pool)
            .await?;

        // Only the caller whose update flips the flag sees rows_affected == 1.
        let completed = sqlx::query(
            r#"
            UPDATE user_challenges
            SET completed = 1, completed_at = ?
            WHERE id = ? AND completed = 0 AND progress >= ?
            "#,
        )
        .bind(tick.at)
        .bind(id)
        .bind(tick.target as i64)
        .execute(pool)
        .await?;

        Ok(ProgressAdvance {
            row: Self::get(pool, id).await?,
            newly_completed: completed.rows_affected() == 1,
        })
    }

    pub async fn list_for_day(pool: &SqlitePool, user: &str, date: NaiveDate) -> LedgerResult<Vec<UserChallenge>> {
        let rows = sqlx::query_as::<_, UserChallenge>(
            "SELECT * FROM user_challenges WHERE user_address = ? AND date = ? ORDER BY challenge_id",
        )
        .bind(user)
        .bind(date)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_completed(pool: &SqlitePool, user: &str) -> LedgerResult<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_challenges WHERE user_address = ? AND completed = 1",
        )
        .bind(user)
        .fetch_one(pool)
        .await?;

        Ok(count as u32)
    }
}

pub struct TaskQueries;

impl TaskQueries {
    pub async fn get_or_create(pool: &SqlitePool, user: &str, task_id: &str, date: NaiveDate) -> LedgerResult<UserDailyTask> {
        sqlx::query(
            r#"
            INSERT INTO user_daily_tasks (id, user_address, task_id, date)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_address, task_id, date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user)
        .bind(task_id)
        .bind(date)
        .execute(pool)
        .await?;

        let row = sqlx::query_as::<_, UserDailyTask>(
            "SELECT * FROM user_daily_tasks WHERE user_address = ? AND task_id = ? AND date = ?",
        )
        .bind(user)
        .bind(task_id)
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> LedgerResult<UserDailyTask> {
        sqlx::query_as::<_, UserDailyTask>("SELECT * FROM user_daily_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user daily task {}", id)))
    }

    pub async fn advance(pool: &SqlitePool, id: &str, tick: ProgressTick) -> LedgerResult<ProgressAdvance<UserDailyTask>> {
        sqlx::query("UPDATE user_daily_tasks SET progress = progress + ? WHERE id = ? AND completed = 0")
            .bind(tick.increment as i64)
            .bind(id)
            .execute(pool)
            .await?;

        let completed = sqlx::query(
            r#"
            UPDATE user_daily_tasks
            SET completed = 1, completed_at = ?
            WHERE id = ? AND completed = 0 AND progress >= ?
            "#,
        )
        .bind(tick.at)
        .bind(id)
        .bind(tick.target as i64)
        .execute(pool)
        .await?;

        Ok(ProgressAdvance {
            row: Self::get(pool, id).await?,
            newly_completed: completed.rows_affected() == 1,
        })
    }

    pub async fn list_for_day(pool: &SqlitePool, user: &str, date: NaiveDate) -> LedgerResult<Vec<UserDailyTask>> {
        let rows = sqlx::query_as::<_, UserDailyTask>(
            "SELECT * FROM user_daily_tasks WHERE user_address = ? AND date = ? ORDER BY task_id",
        )
        .bind(user)
        .bind(date)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}

pub struct CheckinQueries;

impl CheckinQueries {
    pub async fn get(pool: &SqlitePool, user: &str, date: NaiveDate) -> LedgerResult<Option<DailyCheckin>> {
        let checkin = sqlx::query_as::<_, DailyCheckin>(
            "SELECT * FROM daily_checkins WHERE user_address = ? AND date = ?",
        )
        .bind(user)
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(checkin)
    }

    pub async fn create(pool: &SqlitePool, checkin: &NewCheckin) -> LedgerResult<DailyCheckin> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO daily_checkins (id, user_address, date, checked_in_at, reward_amount, consecutive_days, xp_awarded)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&checkin.user_address)
        .bind(checkin.date)
        .bind(checkin.checked_in_at)
        .bind(checkin.reward_amount.to_string())
        .bind(checkin.consecutive_days as i64)
        .bind(to_i64(checkin.xp_awarded, "xp_awarded")?)
        .execute(pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(LedgerError::DuplicateCheckin {
                    user: checkin.user_address.clone(),
                    date: checkin.date,
                })
            }
            Err(err) => return Err(err.into()),
        }

        Self::get(pool, &checkin.user_address, checkin.date)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("check-in {} {}", checkin.user_address, checkin.date)))
    }

    pub async fn list_dates(pool: &SqlitePool, user: &str) -> LedgerResult<Vec<NaiveDate>> {
        let dates = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT date FROM daily_checkins WHERE user_address = ? ORDER BY date ASC",
        )
        .bind(user)
        .fetch_all(pool)
        .await?;

        Ok(dates)
    }
}
