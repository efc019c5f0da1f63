//! Ledger row types.
//!
//! Amounts are persisted as canonical decimal strings, enums as their
//! snake_case names and requirements as tagged JSON. Rows are decoded with
//! hand-written `FromRow` impls so those conversions report as column decode
//! errors instead of panicking.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use progression::{Amount, LessonDifficulty, Requirement};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_address: String,
    pub level: u32,
    pub xp: u64,
    pub total_earned: Amount,
    pub streak: u32,
    pub lessons_completed: u32,
    pub last_check_in: Option<NaiveDate>,
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: i64,
}

impl UserStats {
    /// Stats of a user with no recorded activity.
    pub fn new(user_address: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_address: user_address.to_string(),
            level: 1,
            xp: 0,
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
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: LessonDifficulty,
    pub category: String,
    pub reward_amount: Amount,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub id: String,
    pub user_address: String,
    pub lesson_id: String,
    pub completed_at: DateTime<Utc>,
    pub xp_awarded: u64,
    pub reward_claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub requirement: Requirement,
    pub reward_xp: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: String,
    pub user_address: String,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
    pub xp_awarded: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub challenge_type: String,
    pub reward_amount: Amount,
    pub xp_reward: u64,
    pub target: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChallenge {
    pub id: String,
    pub user_address: String,
    pub challenge_id: String,
    pub date: NaiveDate,
    pub progress: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub reward_claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// Legacy per-day task catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub reward_amount: Amount,
    pub target_value: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDailyTask {
    pub id: String,
    pub user_address: String,
    pub task_id: String,
    pub date: NaiveDate,
    pub progress: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub reward_claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCheckin {
    pub id: String,
    pub user_address: String,
    pub date: NaiveDate,
    pub checked_in_at: DateTime<Utc>,
    pub reward_amount: Amount,
    pub consecutive_days: u32,
    pub xp_awarded: u64,
    pub reward_claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Lesson,
    DailyTask,
    DailyChallenge,
    Checkin,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::Lesson => "lesson",
            RewardType::DailyTask => "daily_task",
            RewardType::DailyChallenge => "daily_challenge",
            RewardType::Checkin => "checkin",
        }
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson" => Ok(RewardType::Lesson),
            "daily_task" => Ok(RewardType::DailyTask),
            "daily_challenge" => Ok(RewardType::DailyChallenge),
            "checkin" => Ok(RewardType::Checkin),
            other => Err(format!("unknown reward type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    Sent,
    Failed,
}

impl RewardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardStatus::Pending => "pending",
            RewardStatus::Sent => "sent",
            RewardStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RewardStatus::Pending),
            "sent" => Ok(RewardStatus::Sent),
            "failed" => Ok(RewardStatus::Failed),
            other => Err(format!("unknown reward status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardTransaction {
    pub id: String,
    pub user_address: String,
    pub reward_type: RewardType,
    pub reward_id: Option<String>,
    pub amount: Amount,
    pub status: RewardStatus,
    pub transaction_hash: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub claim_propagated: bool,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

// Column decoding helpers

fn decode_err<E>(column: &str, err: E) -> sqlx::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: err.into(),
    }
}

fn amount_column(row: &SqliteRow, column: &str) -> Result<Amount, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| decode_err(column, e))
}

fn parsed_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: String| decode_err(column, e))
}

fn u32_column(row: &SqliteRow, column: &str) -> Result<u32, sqlx::Error> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw).map_err(|e| decode_err(column, e))
}

fn u64_column(row: &SqliteRow, column: &str) -> Result<u64, sqlx::Error> {
    let raw: i64 = row.try_get(column)?;
    u64::try_from(raw).map_err(|e| decode_err(column, e))
}

fn unix_column(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let raw: Option<i64> = row.try_get(column)?;
    match raw {
        None => Ok(None),
        Some(secs) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .map(Some)
            .ok_or_else(|| decode_err(column, format!("timestamp out of range: {}", secs))),
    }
}

impl<'r> FromRow<'r, SqliteRow> for UserStats {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_address: row.try_get("user_address")?,
            level: u32_column(row, "level")?,
            xp: u64_column(row, "xp")?,
            total_earned: amount_column(row, "total_earned")?,
            streak: u32_column(row, "streak")?,
            lessons_completed: u32_column(row, "lessons_completed")?,
            last_check_in: row.try_get("last_check_in")?,
            last_activity: row.try_get("last_activity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Lesson {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            difficulty: parsed_column(row, "difficulty")?,
            category: row.try_get("category")?,
            reward_amount: amount_column(row, "reward_amount")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for LessonProgress {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_address: row.try_get("user_address")?,
            lesson_id: row.try_get("lesson_id")?,
            completed_at: row.try_get("completed_at")?,
            xp_awarded: u64_column(row, "xp_awarded")?,
            reward_claimed: row.try_get("reward_claimed")?,
            claimed_at: row.try_get("claimed_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Achievement {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let requirement: String = row.try_get("requirement")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            icon: row.try_get("icon")?,
            requirement: serde_json::from_str(&requirement)
                .map_err(|e| decode_err("requirement", e))?,
            reward_xp: u64_column(row, "reward_xp")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for UserAchievement {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_address: row.try_get("user_address")?,
            achievement_id: row.try_get("achievement_id")?,
            unlocked_at: row.try_get("unlocked_at")?,
            xp_awarded: u64_column(row, "xp_awarded")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for DailyChallenge {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            challenge_type: row.try_get("challenge_type")?,
            reward_amount: amount_column(row, "reward_amount")?,
            xp_reward: u64_column(row, "xp_reward")?,
            target: u32_column(row, "target")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for UserChallenge {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_address: row.try_get("user_address")?,
            challenge_id: row.try_get("challenge_id")?,
            date: row.try_get("date")?,
            progress: u32_column(row, "progress")?,
            completed: row.try_get("completed")?,
            completed_at: row.try_get("completed_at")?,
            reward_claimed: row.try_get("reward_claimed")?,
            claimed_at: row.try_get("claimed_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for DailyTask {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            task_type: row.try_get("task_type")?,
            reward_amount: amount_column(row, "reward_amount")?,
            target_value: u32_column(row, "target_value")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for UserDailyTask {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_address: row.try_get("user_address")?,
            task_id: row.try_get("task_id")?,
            date: row.try_get("date")?,
            progress: u32_column(row, "progress")?,
            completed: row.try_get("completed")?,
            completed_at: row.try_get("completed_at")?,
            reward_claimed: row.try_get("reward_claimed")?,
            claimed_at: row.try_get("claimed_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for DailyCheckin {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_address: row.try_get("user_address")?,
            date: row.try_get("date")?,
            checked_in_at: row.try_get("checked_in_at")?,
            reward_amount: amount_column(row, "reward_amount")?,
            consecutive_days: u32_column(row, "consecutive_days")?,
            xp_awarded: u64_column(row, "xp_awarded")?,
            reward_claimed: row.try_get("reward_claimed")?,
            claimed_at: row.try_get("claimed_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for RewardTransaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_address: row.try_get("user_address")?,
            reward_type: parsed_column(row, "reward_type")?,
            reward_id: row.try_get("reward_id")?,
            amount: amount_column(row, "amount")?,
            status: parsed_column(row, "status")?,
            transaction_hash: row.try_get("transaction_hash")?,
            attempts: u32_column(row, "attempts")?,
            last_error: row.try_get("last_error")?,
            next_attempt_at: unix_column(row, "next_attempt_at")?,
            claim_propagated: row.try_get("claim_propagated")?,
            created_at: row.try_get("created_at")?,
            sent_at: row.try_get("sent_at")?,
        })
    }
}
