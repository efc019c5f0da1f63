use super::to_i64;
use crate::catalog::Catalog;
use crate::errors::LedgerResult;
use crate::models::{Achievement, DailyChallenge, DailyTask, Lesson};
use sqlx::SqlitePool;
use tracing::info;

pub struct CatalogQueries;

impl CatalogQueries {
    pub async fn list_lessons(pool: &SqlitePool) -> LedgerResult<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE is_active = 1 ORDER BY sort_order, id",
        )
        .fetch_all(pool)
        .await?;

        Ok(lessons)
    }

    pub async fn get_lesson(pool: &SqlitePool, lesson_id: &str) -> LedgerResult<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = ? AND is_active = 1")
            .bind(lesson_id)
            .fetch_optional(pool)
            .await?;

        Ok(lesson)
    }

    pub async fn count_lessons(pool: &SqlitePool) -> LedgerResult<u32> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE is_active = 1")
            .fetch_one(pool)
            .await?;

        Ok(count as u32)
    }

    pub async fn list_achievements(pool: &SqlitePool) -> LedgerResult<Vec<Achievement>> {
        let achievements = sqlx::query_as::<_, Achievement>(
            "SELECT * FROM achievements WHERE is_active = 1 ORDER BY sort_order, id",
        )
        .fetch_all(pool)
        .await?;

        Ok(achievements)
    }

    pub async fn list_daily_challenges(pool: &SqlitePool) -> LedgerResult<Vec<DailyChallenge>> {
        let challenges = sqlx::query_as::<_, DailyChallenge>(
            "SELECT * FROM daily_challenges WHERE is_active = 1 ORDER BY sort_order, id",
        )
        .fetch_all(pool)
        .await?;

        Ok(challenges)
    }

    pub async fn find_daily_challenge_by_type(
        pool: &SqlitePool,
        challenge_type: &str,
    ) -> LedgerResult<Option<DailyChallenge>> {
        let challenge = sqlx::query_as::<_, DailyChallenge>(
            r#"
            SELECT * FROM daily_challenges
            WHERE challenge_type = ? AND is_active = 1
            ORDER BY sort_order, id
            LIMIT 1
            "#,
        )
        .bind(challenge_type)
        .fetch_optional(pool)
        .await?;

        Ok(challenge)
    }

    pub async fn list_daily_tasks(pool: &SqlitePool) -> LedgerResult<Vec<DailyTask>> {
        let tasks = sqlx::query_as::<_, DailyTask>(
            "SELECT * FROM daily_tasks WHERE is_active = 1 ORDER BY sort_order, id",
        )
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    pub async fn list_daily_tasks_by_type(pool: &SqlitePool, task_type: &str) -> LedgerResult<Vec<DailyTask>> {
        let tasks = sqlx::query_as::<_, DailyTask>(
            "SELECT * FROM daily_tasks WHERE task_type = ? AND is_active = 1 ORDER BY sort_order, id",
        )
        .bind(task_type)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    pub async fn seed(pool: &SqlitePool, catalog: &Catalog) -> LedgerResult<()> {
        let mut tx = pool.begin().await?;

        for (order, lesson) in catalog.lessons.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO lessons (id, title, description, difficulty, category, reward_amount, is_active, sort_order)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    difficulty = excluded.difficulty,
                    category = excluded.category,
                    reward_amount = excluded.reward_amount,
                    is_active = excluded.is_active,
                    sort_order = excluded.sort_order
                "#,
            )
            .bind(&lesson.id)
            .bind(&lesson.title)
            .bind(&lesson.description)
            .bind(lesson.difficulty.as_str())
            .bind(&lesson.category)
            .bind(lesson.reward_amount.to_string())
            .bind(lesson.is_active)
            .bind(order as i64)
            .execute(&mut *tx)
            .await?;
        }

        for (order, achievement) in catalog.achievements.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO achievements (id, title, description, icon, requirement, reward_xp, is_active, sort_order)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    icon = excluded.icon,
                    requirement = excluded.requirement,
                    reward_xp = excluded.reward_xp,
                    is_active = excluded.is_active,
                    sort_order = excluded.sort_order
                "#,
            )
            .bind(&achievement.id)
            .bind(&achievement.title)
            .bind(&achievement.description)
            .bind(&achievement.icon)
            .bind(serde_json::to_string(&achievement.requirement)?)
            .bind(to_i64(achievement.reward_xp, "reward_xp")?)
            .bind(achievement.is_active)
            .bind(order as i64)
            .execute(&mut *tx)
            .await?;
        }

        for (order, challenge) in catalog.daily_challenges.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO daily_challenges (id, title, description, challenge_type, reward_amount, xp_reward, target, is_active, sort_order)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    challenge_type = excluded.challenge_type,
                    reward_amount = excluded.reward_amount,
                    xp_reward = excluded.xp_reward,
                    target = excluded.target,
                    is_active = excluded.is_active,
                    sort_order = excluded.sort_order
                "#,
            )
            .bind(&challenge.id)
            .bind(&challenge.title)
            .bind(&challenge.description)
            .bind(&challenge.challenge_type)
            .bind(challenge.reward_amount.to_string())
            .bind(to_i64(challenge.xp_reward, "xp_reward")?)
            .bind(challenge.target as i64)
            .bind(challenge.is_active)
            .bind(order as i64)
            .execute(&mut *tx)
            .await?;
        }

        for (order, task) in catalog.daily_tasks.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO daily_tasks (id, title, description, task_type, reward_amount, target_value, is_active, sort_order)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    task_type = excluded.task_type,
                    reward_amount = excluded.reward_amount,
                    target_value = excluded.target_value,
                    is_active = excluded.is_active,
                    sort_order = excluded.sort_order
                "#,
            )
            .bind(&task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(&task.task_type)
            .bind(task.reward_amount.to_string())
            .bind(task.target_value as i64)
            .bind(task.is_active)
            .bind(order as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Seeded catalog: {} lessons, {} achievements, {} daily challenges, {} daily tasks",
            catalog.lessons.len(),
            catalog.achievements.len(),
            catalog.daily_challenges.len(),
            catalog.daily_tasks.len()
        );
        Ok(())
    }
}
