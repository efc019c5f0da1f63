use super::to_i64;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::UserStats;
use crate::store::{StatsChange, StatsUpdate};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

/// Compare-and-swap attempts before `update` gives up with `Conflict`.
const MAX_CAS_RETRIES: usize = 8;

pub struct UserQueries;

impl UserQueries {
    pub async fn get(pool: &SqlitePool, user: &str) -> LedgerResult<Option<UserStats>> {
        let stats = sqlx::query_as::<_, UserStats>("SELECT * FROM user_stats WHERE user_address = ?")
            .bind(user)
            .fetch_optional(pool)
            .await?;

        Ok(stats)
    }

    pub async fn get_or_create(pool: &SqlitePool, user: &str) -> LedgerResult<UserStats> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO user_stats (user_address, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_address) DO NOTHING
            "#,
        )
        .bind(user)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, user)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user stats for {}", user)))
    }

    pub async fn update(pool: &SqlitePool, user: &str, update: &StatsUpdate) -> LedgerResult<StatsChange> {
        for attempt in 1..=MAX_CAS_RETRIES {
            let before = Self::get_or_create(pool, user).await?;
            let mut after = update.apply(&before);
            after.updated_at = Utc::now();

            let result = sqlx::query(
                r#"
                UPDATE user_stats
                SET level = ?,
                    xp = ?,
                    total_earned = ?,
                    streak = ?,
                    lessons_completed = ?,
                    last_check_in = ?,
                    last_activity = ?,
                    updated_at = ?,
                    version = version + 1
                WHERE user_address = ? AND version = ?
                "#,
            )
            .bind(after.level as i64)
            .bind(to_i64(after.xp, "xp")?)
            .bind(after.total_earned.to_string())
            .bind(after.streak as i64)
            .bind(after.lessons_completed as i64)
            .bind(after.last_check_in)
            .bind(after.last_activity)
            .bind(after.updated_at)
            .bind(user)
            .bind(before.version)
            .execute(pool)
            .await?;

            if result.rows_affected() == 1 {
                after.version = before.version + 1;
                return Ok(StatsChange { before, after });
            }

            debug!("Stats version conflict for {} (attempt {})", user, attempt);
        }

        Err(LedgerError::Conflict(format!(
            "user stats for {} changed concurrently {} times",
            user, MAX_CAS_RETRIES
        )))
    }
}
