//! Action recorder: turns user actions into progression changes and pending
//! reward transactions.
//!
//! Every mutating entry point follows the same order. The store's uniqueness
//! constraint is hit first, so a duplicate request fails before any XP or
//! reward is written. The pending reward is created right behind that row,
//! progression is updated next, and achievements are re-evaluated last
//! against the new stats. A failed stats update therefore never loses a
//! reward whose gate row already exists.

use crate::clock::Clock;
use crate::error::{Result, RewardError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use gateway::normalize_address;
use ledger::{
    Achievement, DailyChallenge, DailyTask, LedgerStore, Lesson, LessonProgress, NewCheckin, NewRewardTransaction, PayoutSummary,
    ProgressTick, RewardTransaction, RewardType, StatsChange, StatsUpdate, UserStats,
};
use progression::{
    consecutive_checkins, evaluate_achievement, Amount, CheckinPolicy, LevelProgress, ProgressSnapshot,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// What a single action changed, for celebratory feedback in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub xp_awarded: u64,
    pub level_before: u32,
    pub level_after: u32,
    pub leveled_up: bool,
    pub new_achievements: Vec<Achievement>,
    pub rewards: Vec<RewardTransaction>,
    pub completed_challenges: Vec<DailyChallenge>,
    pub completed_tasks: Vec<DailyTask>,
    /// Set by check-ins.
    pub streak: Option<u32>,
    pub stats: UserStats,
}

struct OutcomeBuilder {
    level_before: u32,
    xp_awarded: u64,
    new_achievements: Vec<Achievement>,
    rewards: Vec<RewardTransaction>,
    completed_challenges: Vec<DailyChallenge>,
    completed_tasks: Vec<DailyTask>,
    streak: Option<u32>,
    stats: UserStats,
}

impl OutcomeBuilder {
    fn new(stats: UserStats) -> Self {
        Self {
            level_before: stats.level,
            xp_awarded: 0,
            new_achievements: Vec::new(),
            rewards: Vec::new(),
            completed_challenges: Vec::new(),
            completed_tasks: Vec::new(),
            streak: None,
            stats,
        }
    }

    fn absorb(&mut self, change: StatsChange) {
        self.xp_awarded += change.after.xp.saturating_sub(change.before.xp);
        self.stats = change.after;
    }

    fn finish(self) -> ActionOutcome {
        ActionOutcome {
            xp_awarded: self.xp_awarded,
            level_before: self.level_before,
            level_after: self.stats.level,
            leveled_up: self.stats.level > self.level_before,
            new_achievements: self.new_achievements,
            rewards: self.rewards,
            completed_challenges: self.completed_challenges,
            completed_tasks: self.completed_tasks,
            streak: self.streak,
            stats: self.stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    #[serde(flatten)]
    pub stats: UserStats,
    pub level_progress: LevelProgress,
    pub achievements_unlocked: u32,
    pub challenges_completed: u32,
    pub payout_status: PayoutSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeView {
    #[serde(flatten)]
    pub challenge: DailyChallenge,
    pub date: NaiveDate,
    pub progress: u32,
    pub completed: bool,
    pub reward_claimed: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTaskView {
    #[serde(flatten)]
    pub task: DailyTask,
    pub date: NaiveDate,
    pub progress: u32,
    pub completed: bool,
    pub reward_claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub xp_reward: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardHistory {
    pub transactions: Vec<RewardTransaction>,
    pub summary: PayoutSummary,
}

/// Start of the UTC day after `date`, when that day's challenges expire.
pub fn next_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.succ_opt().unwrap_or(date).and_time(NaiveTime::MIN).and_utc()
}

pub struct ActionRecorder {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    checkin_policy: CheckinPolicy,
}

impl ActionRecorder {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, checkin_policy: CheckinPolicy) -> Self {
        Self {
            store,
            clock,
            checkin_policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub async fn complete_lesson(&self, user: &str, lesson_id: &str) -> Result<ActionOutcome> {
        let user = normalize_address(user)?;
        let lesson = self
            .store
            .get_lesson(lesson_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("lesson {}", lesson_id)))?;
        let now = self.clock.now();

        let mut outcome = OutcomeBuilder::new(self.store.get_or_create_user_stats(&user).await?);

        let xp = lesson.difficulty.xp_reward();
        let progress = self
            .store
            .create_lesson_progress(&user, &lesson.id, xp, now)
            .await?;

        self.queue_reward(&user, RewardType::Lesson, &progress.id, lesson.reward_amount, &mut outcome)
            .await?;

        let change = self
            .store
            .update_user_stats(
                &user,
                StatsUpdate::new()
                    .add_xp(xp)
                    .add_lessons(1)
                    .add_earned(lesson.reward_amount)
                    .touch(now),
            )
            .await?;
        outcome.absorb(change);
        info!("{} completed lesson {} (+{} XP)", user, lesson.id, xp);

        self.tick_challenge(&user, "lesson", 1, &mut outcome).await?;
        self.evaluate_achievements(&user, &mut outcome).await?;

        Ok(outcome.finish())
    }

    pub async fn daily_checkin(&self, user: &str) -> Result<ActionOutcome> {
        let user = normalize_address(user)?;
        let now = self.clock.now();
        let today = now.date_naive();

        if self.store.get_checkin(&user, today).await?.is_some() {
            debug!("{} already checked in on {}", user, today);
            return Err(RewardError::AlreadyCheckedInToday(format!("{} on {}", user, today)));
        }

        let mut outcome = OutcomeBuilder::new(self.store.get_or_create_user_stats(&user).await?);

        let mut history = self.store.list_checkin_dates(&user).await?;
        history.retain(|date| *date < today);
        history.push(today);
        let streak = consecutive_checkins(&history);
        let reward = self.checkin_policy.reward(streak);
        let xp = self.checkin_policy.xp(streak);

        let checkin = self
            .store
            .create_checkin(NewCheckin {
                user_address: user.clone(),
                date: today,
                checked_in_at: now,
                reward_amount: reward,
                consecutive_days: streak,
                xp_awarded: xp,
            })
            .await?;

        self.queue_reward(&user, RewardType::Checkin, &checkin.id, reward, &mut outcome)
            .await?;

        let change = self
            .store
            .update_user_stats(
                &user,
                StatsUpdate::new()
                    .add_xp(xp)
                    .add_earned(reward)
                    .set_streak(streak)
                    .set_last_check_in(today)
                    .touch(now),
            )
            .await?;
        outcome.absorb(change);
        outcome.streak = Some(streak);
        info!("{} checked in on {} (streak {}, reward {})", user, today, streak, reward);

        self.tick_challenge(&user, "daily_checkin", 1, &mut outcome).await?;
        self.evaluate_achievements(&user, &mut outcome).await?;

        Ok(outcome.finish())
    }

    /// Advance today's challenge of `challenge_type`. A type with no active
    /// challenge is accepted and changes nothing.
    pub async fn update_challenge_progress(
        &self,
        user: &str,
        challenge_type: &str,
        increment: u32,
    ) -> Result<ActionOutcome> {
        let user = normalize_address(user)?;
        if increment == 0 {
            return Err(RewardError::InvalidInput("increment must be at least 1".to_string()));
        }

        let stats = match self.store.get_user_stats(&user).await? {
            Some(stats) => stats,
            None => UserStats::new(&user, self.clock.now()),
        };
        let mut outcome = OutcomeBuilder::new(stats);

        if self.tick_challenge(&user, challenge_type, increment, &mut outcome).await? {
            self.evaluate_achievements(&user, &mut outcome).await?;
        }

        Ok(outcome.finish())
    }

    /// Legacy per-day tasks: one tick against every active task of `task_type`.
    pub async fn track_task(&self, user: &str, task_type: &str) -> Result<ActionOutcome> {
        let user = normalize_address(user)?;
        let now = self.clock.now();
        let today = now.date_naive();

        let stats = match self.store.get_user_stats(&user).await? {
            Some(stats) => stats,
            None => UserStats::new(&user, now),
        };
        let mut outcome = OutcomeBuilder::new(stats);

        for task in self.store.list_daily_tasks_by_type(task_type).await? {
            let row = self.store.get_or_create_user_daily_task(&user, &task.id, today).await?;
            if row.completed {
                continue;
            }

            let tick = ProgressTick {
                increment: 1,
                target: task.target_value.max(1),
                at: now,
            };
            let advance = self.store.update_user_daily_task(&row.id, tick).await?;
            if !advance.newly_completed {
                continue;
            }

            let change = self
                .store
                .update_user_stats(&user, StatsUpdate::new().add_earned(task.reward_amount).touch(now))
                .await?;
            outcome.absorb(change);
            self.queue_reward(&user, RewardType::DailyTask, &advance.row.id, task.reward_amount, &mut outcome)
                .await?;

            info!("{} completed daily task {}", user, task.id);
            outcome.completed_tasks.push(task);
        }

        Ok(outcome.finish())
    }

    pub async fn get_stats(&self, user: &str) -> Result<StatsView> {
        let user = normalize_address(user)?;
        let stats = match self.store.get_user_stats(&user).await? {
            Some(stats) => stats,
            None => UserStats::new(&user, self.clock.now()),
        };

        Ok(StatsView {
            level_progress: LevelProgress::from_xp(stats.xp),
            achievements_unlocked: self.store.get_unlocked_achievements(&user).await?.len() as u32,
            challenges_completed: self.store.count_completed_challenges(&user).await?,
            payout_status: self.store.payout_summary(&user).await?,
            stats,
        })
    }

    pub async fn get_achievements(&self, user: &str) -> Result<Vec<AchievementView>> {
        let user = normalize_address(user)?;
        let unlocked: HashMap<String, DateTime<Utc>> = self
            .store
            .get_unlocked_achievements(&user)
            .await?
            .into_iter()
            .map(|u| (u.achievement_id, u.unlocked_at))
            .collect();

        let views = self
            .store
            .list_achievements()
            .await?
            .into_iter()
            .map(|achievement| {
                let unlocked_at = unlocked.get(&achievement.id).copied();
                AchievementView {
                    achievement,
                    unlocked: unlocked_at.is_some(),
                    unlocked_at,
                }
            })
            .collect();

        Ok(views)
    }

    /// Every active challenge with the user's progress on `date` (today by default).
    pub async fn get_challenges(&self, user: &str, date: Option<NaiveDate>) -> Result<Vec<ChallengeView>> {
        let user = normalize_address(user)?;
        let date = date.unwrap_or_else(|| self.clock.today());

        let mut rows: HashMap<String, _> = self
            .store
            .list_user_challenges(&user, date)
            .await?
            .into_iter()
            .map(|row| (row.challenge_id.clone(), row))
            .collect();

        let views = self
            .store
            .list_daily_challenges()
            .await?
            .into_iter()
            .map(|challenge| match rows.remove(&challenge.id) {
                Some(row) => ChallengeView {
                    challenge,
                    date,
                    progress: row.progress,
                    completed: row.completed,
                    reward_claimed: row.reward_claimed,
                    expires_at: row.expires_at,
                },
                None => ChallengeView {
                    challenge,
                    date,
                    progress: 0,
                    completed: false,
                    reward_claimed: false,
                    expires_at: next_midnight(date),
                },
            })
            .collect();

        Ok(views)
    }

    /// Lessons the user completed, with their payout claim state.
    pub async fn get_lesson_progress(&self, user: &str) -> Result<Vec<LessonProgress>> {
        let user = normalize_address(user)?;
        Ok(self.store.list_lesson_progress(&user).await?)
    }

    /// Every active legacy task with the user's progress on `date` (today by default).
    pub async fn get_daily_tasks(&self, user: &str, date: Option<NaiveDate>) -> Result<Vec<DailyTaskView>> {
        let user = normalize_address(user)?;
        let date = date.unwrap_or_else(|| self.clock.today());

        let mut rows: HashMap<String, _> = self
            .store
            .list_user_daily_tasks(&user, date)
            .await?
            .into_iter()
            .map(|row| (row.task_id.clone(), row))
            .collect();

        let views = self
            .store
            .list_daily_tasks()
            .await?
            .into_iter()
            .map(|task| {
                let row = rows.remove(&task.id);
                DailyTaskView {
                    date,
                    progress: row.as_ref().map_or(0, |r| r.progress),
                    completed: row.as_ref().is_some_and(|r| r.completed),
                    reward_claimed: row.as_ref().is_some_and(|r| r.reward_claimed),
                    task,
                }
            })
            .collect();

        Ok(views)
    }

    pub async fn get_reward_history(&self, user: &str) -> Result<RewardHistory> {
        let user = normalize_address(user)?;
        Ok(RewardHistory {
            transactions: self.store.list_reward_transactions(&user).await?,
            summary: self.store.payout_summary(&user).await?,
        })
    }

    pub async fn list_lessons(&self) -> Result<Vec<LessonView>> {
        let lessons = self
            .store
            .list_lessons()
            .await?
            .into_iter()
            .map(|lesson| LessonView {
                xp_reward: lesson.difficulty.xp_reward(),
                lesson,
            })
            .collect();
        Ok(lessons)
    }

    async fn queue_reward(
        &self,
        user: &str,
        reward_type: RewardType,
        reward_id: &str,
        amount: Amount,
        outcome: &mut OutcomeBuilder,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let tx = self
            .store
            .create_reward_transaction(NewRewardTransaction {
                user_address: user.to_string(),
                reward_type,
                reward_id: Some(reward_id.to_string()),
                amount,
            })
            .await?;
        debug!("Queued {} reward {} of {} for {}", reward_type, tx.id, amount, user);
        outcome.rewards.push(tx);
        Ok(())
    }

    /// Returns whether this tick completed the challenge.
    async fn tick_challenge(
        &self,
        user: &str,
        challenge_type: &str,
        increment: u32,
        outcome: &mut OutcomeBuilder,
    ) -> Result<bool> {
        let Some(challenge) = self.store.find_daily_challenge_by_type(challenge_type).await? else {
            debug!("No active challenge of type {}", challenge_type);
            return Ok(false);
        };

        let now = self.clock.now();
        let today = now.date_naive();
        let row = self
            .store
            .get_or_create_user_challenge(user, &challenge.id, today, next_midnight(today))
            .await?;
        if row.completed {
            return Ok(false);
        }

        let tick = ProgressTick {
            increment,
            target: challenge.target.max(1),
            at: now,
        };
        let advance = self.store.update_user_challenge(&row.id, tick).await?;
        if !advance.newly_completed {
            return Ok(false);
        }

        let change = self
            .store
            .update_user_stats(
                user,
                StatsUpdate::new()
                    .add_xp(challenge.xp_reward)
                    .add_earned(challenge.reward_amount)
                    .touch(now),
            )
            .await?;
        outcome.absorb(change);
        self.queue_reward(
            user,
            RewardType::DailyChallenge,
            &advance.row.id,
            challenge.reward_amount,
            outcome,
        )
        .await?;

        info!("{} completed daily challenge {}", user, challenge.id);
        outcome.completed_challenges.push(challenge);
        Ok(true)
    }

    /// Unlock everything the current stats qualify for, crediting achievement
    /// XP as it goes. Repeats until a pass unlocks nothing, so a level gate
    /// reached through achievement XP opens in the same call.
    async fn evaluate_achievements(&self, user: &str, outcome: &mut OutcomeBuilder) -> Result<()> {
        let catalog = self.store.list_achievements().await?;
        let total_lessons = self.store.count_lessons().await?;
        let challenges_completed = self.store.count_completed_challenges(user).await?;
        let mut unlocked: HashSet<String> = self
            .store
            .get_unlocked_achievements(user)
            .await?
            .into_iter()
            .map(|u| u.achievement_id)
            .collect();

        for _ in 0..=catalog.len() {
            let snapshot = ProgressSnapshot {
                lessons_completed: outcome.stats.lessons_completed,
                streak: outcome.stats.streak,
                level: outcome.stats.level,
                total_lessons,
                challenges_completed,
            };

            let mut progressed = false;
            for achievement in &catalog {
                if unlocked.contains(&achievement.id) || !evaluate_achievement(&achievement.requirement, &snapshot) {
                    continue;
                }
                unlocked.insert(achievement.id.clone());

                let now = self.clock.now();
                if !self
                    .store
                    .unlock_achievement(user, &achievement.id, achievement.reward_xp, now)
                    .await?
                {
                    // Unlocked concurrently by another request.
                    continue;
                }

                if achievement.reward_xp > 0 {
                    let change = self
                        .store
                        .update_user_stats(user, StatsUpdate::new().add_xp(achievement.reward_xp).touch(now))
                        .await?;
                    outcome.absorb(change);
                }

                info!("{} unlocked achievement {}", user, achievement.id);
                outcome.new_achievements.push(achievement.clone());
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        Ok(())
    }
}
