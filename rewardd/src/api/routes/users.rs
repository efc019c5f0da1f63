//! Per-user read routes

use crate::error::Result;
use crate::recorder::{AchievementView, ActionRecorder, ChallengeView, DailyTaskView, RewardHistory, StatsView};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use ledger::LessonProgress;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct DateParams {
    date: Option<NaiveDate>,
}

pub fn routes(recorder: Arc<ActionRecorder>) -> Router {
    Router::new()
        .route("/users/:address/stats", get(get_stats))
        .route("/users/:address/achievements", get(get_achievements))
        .route("/users/:address/challenges", get(get_challenges))
        .route("/users/:address/daily-tasks", get(get_daily_tasks))
        .route("/users/:address/progress", get(get_lesson_progress))
        .route("/users/:address/rewards", get(get_rewards))
        .with_state(recorder)
}

#[axum::debug_handler]
async fn get_stats(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
) -> Result<Json<StatsView>> {
    Ok(Json(recorder.get_stats(&address).await?))
}

#[axum::debug_handler]
async fn get_achievements(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<AchievementView>>> {
    Ok(Json(recorder.get_achievements(&address).await?))
}

#[axum::debug_handler]
async fn get_challenges(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
    Query(params): Query<DateParams>,
) -> Result<Json<Vec<ChallengeView>>> {
    Ok(Json(recorder.get_challenges(&address, params.date).await?))
}

#[axum::debug_handler]
async fn get_daily_tasks(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
    Query(params): Query<DateParams>,
) -> Result<Json<Vec<DailyTaskView>>> {
    Ok(Json(recorder.get_daily_tasks(&address, params.date).await?))
}

#[axum::debug_handler]
async fn get_lesson_progress(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<LessonProgress>>> {
    Ok(Json(recorder.get_lesson_progress(&address).await?))
}

#[axum::debug_handler]
async fn get_rewards(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
) -> Result<Json<RewardHistory>> {
    Ok(Json(recorder.get_reward_history(&address).await?))
}
