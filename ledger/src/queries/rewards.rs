use crate::errors::{LedgerError, LedgerResult};
use crate::models::{RewardStatus, RewardTransaction, RewardType};
use crate::store::{NewRewardTransaction, PayoutSummary, StatusTransition};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct RewardQueries;

impl RewardQueries {
    pub async fn create(pool: &SqlitePool, tx: &NewRewardTransaction) -> LedgerResult<RewardTransaction> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO reward_transactions (id, user_address, reward_type, reward_id, amount, status, created_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(&id)
        .bind(&tx.user_address)
        .bind(tx.reward_type.as_str())
        .bind(&tx.reward_id)
        .bind(tx.amount.to_string())
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, &id).await
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> LedgerResult<RewardTransaction> {
        sqlx::query_as::<_, RewardTransaction>("SELECT * FROM reward_transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("reward transaction {}", id)))
    }

    pub async fn transition(pool: &SqlitePool, id: &str, transition: &StatusTransition) -> LedgerResult<RewardTransaction> {
        let result = match transition {
            StatusTransition::Sent { hash, sent_at } => {
                sqlx::query(
                    r#"
                    UPDATE reward_transactions
                    SET status = 'sent',
                        transaction_hash = ?,
                        sent_at = ?,
                        attempts = attempts + 1,
                        last_error = NULL,
                        next_attempt_at = NULL
                    WHERE id = ? AND status != 'sent'
                    "#,
                )
                .bind(hash)
                .bind(sent_at)
                .bind(id)
                .execute(pool)
                .await?
            }
            StatusTransition::Failed { reason, retry_at } => {
                sqlx::query(
                    r#"
                    UPDATE reward_transactions
                    SET status = 'failed',
                        transaction_hash = NULL,
                        sent_at = NULL,
                        attempts = attempts + 1,
                        last_error = ?,
                        next_attempt_at = ?
                    WHERE id = ? AND status != 'sent'
                    "#,
                )
                .bind(reason)
                .bind(retry_at.map(|at| at.timestamp()))
                .bind(id)
                .execute(pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            // Either the row is missing or it is already terminal.
            let existing = Self::get(pool, id).await?;
            return Err(LedgerError::InvalidTransition(format!(
                "reward transaction {} is already {}",
                id, existing.status
            )));
        }

        Self::get(pool, id).await
    }

    pub async fn list_due(pool: &SqlitePool, now: DateTime<Utc>) -> LedgerResult<Vec<RewardTransaction>> {
        let rows = sqlx::query_as::<_, RewardTransaction>(
            r#"
            SELECT * FROM reward_transactions
            WHERE status = 'pending'
               OR (status = 'failed' AND next_attempt_at IS NOT NULL AND next_attempt_at <= ?)
            ORDER BY seq ASC
            "#,
        )
        .bind(now.timestamp())
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_user(pool: &SqlitePool, user: &str) -> LedgerResult<Vec<RewardTransaction>> {
        let rows = sqlx::query_as::<_, RewardTransaction>(
            "SELECT * FROM reward_transactions WHERE user_address = ? ORDER BY seq DESC",
        )
        .bind(user)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn summary(pool: &SqlitePool, user: &str) -> LedgerResult<PayoutSummary> {
        let mut summary = PayoutSummary::default();
        for tx in Self::list_for_user(pool, user).await? {
            summary.record(&tx);
        }
        Ok(summary)
    }

    pub async fn mark_claimed(
        pool: &SqlitePool,
        reward_type: RewardType,
        reward_id: &str,
        at: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let table = match reward_type {
            RewardType::Lesson => "lesson_progress",
            RewardType::DailyTask => "user_daily_tasks",
            RewardType::DailyChallenge => "user_challenges",
            RewardType::Checkin => "daily_checkins",
        };

        let sql = format!(
            "UPDATE {} SET reward_claimed = 1, claimed_at = ? WHERE id = ? AND reward_claimed = 0",
            table
        );
        let result = sqlx::query(&sql).bind(at).bind(reward_id).execute(pool).await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_unpropagated(pool: &SqlitePool) -> LedgerResult<Vec<RewardTransaction>> {
        let rows = sqlx::query_as::<_, RewardTransaction>(
            r#"
            SELECT * FROM reward_transactions
            WHERE status = ? AND claim_propagated = 0
            ORDER BY seq ASC
            "#,
        )
        .bind(RewardStatus::Sent.as_str())
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn mark_propagated(pool: &SqlitePool, id: &str) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE reward_transactions SET claim_propagated = 1 WHERE id = ? AND status = 'sent'",
        )
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            let existing = Self::get(pool, id).await?;
            return Err(LedgerError::InvalidTransition(format!(
                "cannot propagate claim for {} reward transaction {}",
                existing.status, id
            )));
        }
        Ok(())
    }
}
