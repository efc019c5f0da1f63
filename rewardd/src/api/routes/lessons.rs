//! Lesson catalog routes

use crate::error::Result;
use crate::recorder::{ActionRecorder, LessonView};
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

pub fn routes(recorder: Arc<ActionRecorder>) -> Router {
    Router::new()
        .route("/lessons", get(list_lessons))
        .with_state(recorder)
}

#[axum::debug_handler]
async fn list_lessons(State(recorder): State<Arc<ActionRecorder>>) -> Result<Json<Vec<LessonView>>> {
    Ok(Json(recorder.list_lessons().await?))
}
