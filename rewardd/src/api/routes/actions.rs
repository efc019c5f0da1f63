//! Action routes. Each returns the `ActionOutcome` of the action.

use crate::error::Result;
use crate::recorder::{ActionOutcome, ActionRecorder};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeProgressRequest {
    challenge_type: String,
    #[serde(default = "default_increment")]
    increment: u32,
}

fn default_increment() -> u32 {
    1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackTaskRequest {
    task_type: String,
}

pub fn routes(recorder: Arc<ActionRecorder>) -> Router {
    Router::new()
        .route("/users/:address/lessons/:lesson_id/complete", post(complete_lesson))
        .route("/users/:address/checkin", post(daily_checkin))
        .route("/users/:address/challenges/progress", post(update_challenge_progress))
        .route("/users/:address/tasks/track", post(track_task))
        .with_state(recorder)
}

#[axum::debug_handler]
async fn complete_lesson(
    State(recorder): State<Arc<ActionRecorder>>,
    Path((address, lesson_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<ActionOutcome>)> {
    let outcome = recorder.complete_lesson(&address, &lesson_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[axum::debug_handler]
async fn daily_checkin(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
) -> Result<(StatusCode, Json<ActionOutcome>)> {
    let outcome = recorder.daily_checkin(&address).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[axum::debug_handler]
async fn update_challenge_progress(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
    Json(request): Json<ChallengeProgressRequest>,
) -> Result<Json<ActionOutcome>> {
    let outcome = recorder
        .update_challenge_progress(&address, &request.challenge_type, request.increment)
        .await?;
    Ok(Json(outcome))
}

#[axum::debug_handler]
async fn track_task(
    State(recorder): State<Arc<ActionRecorder>>,
    Path(address): Path<String>,
    Json(request): Json<TrackTaskRequest>,
) -> Result<Json<ActionOutcome>> {
    Ok(Json(recorder.track_task(&address, &request.task_type).await?))
}
