use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use gateway::MemoryGateway;
use ledger::{Catalog, LedgerStore, SqliteLedger};
use progression::CheckinPolicy;
use rewardd::api::ApiServer;
use rewardd::clock::FixedClock;
use rewardd::payout::{PayoutProcessor, PayoutSettings};
use rewardd::recorder::ActionRecorder;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const USER: &str = "0x00000000000000000000000000000000000000b0";
const WALLET: &str = "0x00000000000000000000000000000000000000aa";

struct TestApp {
    _dir: TempDir,
    router: Router,
    clock: Arc<FixedClock>,
    gateway: Arc<MemoryGateway>,
    processor: PayoutProcessor,
}

async fn setup() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(SqliteLedger::open(&dir.path().join("rewards.db")).await.unwrap());
    ledger.migrate().await.unwrap();
    ledger.seed_catalog(&Catalog::standard()).await.unwrap();

    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()));
    let recorder = Arc::new(ActionRecorder::new(ledger.clone(), clock.clone(), CheckinPolicy::default()));
    let gateway = Arc::new(MemoryGateway::new(WALLET, "100".parse().unwrap()).unwrap());
    let processor = PayoutProcessor::new(ledger, gateway.clone(), clock.clone(), PayoutSettings::default());

    TestApp {
        _dir: dir,
        router: ApiServer::new(recorder, "127.0.0.1", 0).router(),
        clock,
        gateway,
        processor,
    }
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_and_lessons() {
    let app = setup().await;

    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/api/v1/lessons", None).await;
    assert_eq!(status, StatusCode::OK);
    let lessons = body.as_array().unwrap();
    assert_eq!(lessons.len(), 6);
    assert_eq!(lessons[0]["id"], "intro-crypto");
    assert_eq!(lessons[0]["xpReward"], 50);
    assert_eq!(lessons[0]["rewardAmount"], "10");
}

#[tokio::test]
async fn complete_lesson_then_duplicate() {
    let app = setup().await;
    let uri = format!("/api/v1/users/{}/lessons/intro-crypto/complete", USER);

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["xpAwarded"], 125);
    assert_eq!(body["leveledUp"], true);
    assert_eq!(body["newAchievements"][0]["id"], "first_lesson");
    assert_eq!(body["rewards"][0]["status"], "pending");
    assert_eq!(body["rewards"][0]["rewardType"], "lesson");

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already completed"));

    let missing = format!("/api/v1/users/{}/lessons/quantum-finance/complete", USER);
    let (status, _) = send(&app, "POST", &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_address_is_bad_request() {
    let app = setup().await;
    let (status, body) = send(&app, "POST", "/api/v1/users/not-an-address/checkin", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn checkin_once_per_day() {
    let app = setup().await;
    let uri = format!("/api/v1/users/{}/checkin", USER);

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["streak"], 1);
    assert_eq!(body["rewards"][0]["amount"], "0.011");

    let (status, _) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.clock.advance(Duration::days(1));
    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["streak"], 2);
    assert_eq!(body["stats"]["streak"], 2);
}

#[tokio::test]
async fn challenge_progress_and_listing() {
    let app = setup().await;
    let progress = format!("/api/v1/users/{}/challenges/progress", USER);

    let (status, body) = send(&app, "POST", &progress, Some(json!({ "challengeType": "swap" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completedChallenges"][0]["id"], "swap_tokens");
    assert_eq!(body["xpAwarded"], 20);

    let (status, _) = send(
        &app,
        "POST",
        &progress,
        Some(json!({ "challengeType": "swap", "increment": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", &format!("/api/v1/users/{}/challenges", USER), None).await;
    assert_eq!(status, StatusCode::OK);
    let challenges = body.as_array().unwrap();
    assert_eq!(challenges.len(), 4);
    let swap = challenges.iter().find(|c| c["id"] == "swap_tokens").unwrap();
    assert_eq!(swap["completed"], true);
    assert_eq!(swap["expiresAt"], "2024-06-02T00:00:00Z");

    let earlier = format!("/api/v1/users/{}/challenges?date=2024-05-31", USER);
    let (_, body) = send(&app, "GET", &earlier, None).await;
    assert!(body.as_array().unwrap().iter().all(|c| c["completed"] == false));
}

#[tokio::test]
async fn track_task_route() {
    let app = setup().await;
    let uri = format!("/api/v1/users/{}/tasks/track", USER);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "taskType": "swap" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completedTasks"][0]["id"], "daily-trader");
    assert_eq!(body["rewards"][0]["rewardType"], "daily_task");
}

#[tokio::test]
async fn stats_and_rewards_reflect_payouts() {
    let app = setup().await;
    send(&app, "POST", &format!("/api/v1/users/{}/checkin", USER), None).await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/users/{}/stats", USER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userAddress"], USER);
    assert_eq!(body["levelProgress"]["level"], 1);
    assert_eq!(body["payoutStatus"]["pendingCount"], 2);

    let report = app.processor.run_cycle().await.unwrap();
    assert_eq!(report.sent, 2);
    assert_eq!(app.gateway.transfers().len(), 2);

    let (_, body) = send(&app, "GET", &format!("/api/v1/users/{}/rewards", USER), None).await;
    assert_eq!(body["summary"]["sentCount"], 2);
    assert_eq!(body["summary"]["pendingCount"], 0);
    let transactions = body["transactions"].as_array().unwrap();
    assert!(transactions.iter().all(|tx| tx["status"] == "sent"));
    assert!(transactions.iter().all(|tx| tx["transactionHash"].is_string()));

    let (_, body) = send(&app, "GET", &format!("/api/v1/users/{}/achievements", USER), None).await;
    let achievements = body.as_array().unwrap();
    assert_eq!(achievements.len(), 7);
    assert!(achievements.iter().all(|a| a["unlocked"] == false));
}

#[tokio::test]
async fn lesson_progress_route() {
    let app = setup().await;
    let uri = format!("/api/v1/users/{}/progress", USER);

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    send(&app, "POST", &format!("/api/v1/users/{}/lessons/intro-crypto/complete", USER), None).await;
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let progress = body.as_array().unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0]["lessonId"], "intro-crypto");
    assert_eq!(progress[0]["xpAwarded"], 50);
    assert_eq!(progress[0]["rewardClaimed"], false);

    let (status, _) = send(&app, "GET", "/api/v1/users/not-an-address/progress", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn daily_tasks_route() {
    let app = setup().await;
    send(&app, "POST", &format!("/api/v1/users/{}/tasks/track", USER), Some(json!({ "taskType": "swap" }))).await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/users/{}/daily-tasks", USER), None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body.as_array().unwrap();
    assert_eq!(tasks.len(), 3);
    let trader = tasks.iter().find(|t| t["id"] == "daily-trader").unwrap();
    assert_eq!(trader["completed"], true);
    assert_eq!(trader["progress"], 1);
    assert_eq!(trader["rewardClaimed"], false);
    assert_eq!(trader["date"], "2024-06-01");
    assert_eq!(trader["taskType"], "swap");

    let earlier = format!("/api/v1/users/{}/daily-tasks?date=2024-05-31", USER);
    let (status, body) = send(&app, "GET", &earlier, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().iter().all(|t| t["completed"] == false));
}
