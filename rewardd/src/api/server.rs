//! API server implementation

use crate::api::routes;
use crate::error::{Result, RewardError};
use crate::recorder::ActionRecorder;
use axum::{http::Method, Router};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    recorder: Arc<ActionRecorder>,
    bind_address: String,
    port: u16,
}

impl ApiServer {
    pub fn new(recorder: Arc<ActionRecorder>, bind_address: &str, port: u16) -> Self {
        Self {
            recorder,
            bind_address: bind_address.to_string(),
            port,
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        Router::new()
            .nest(
                "/api/v1",
                Router::new()
                    .merge(routes::health::routes())
                    .merge(routes::lessons::routes(self.recorder.clone()))
                    .merge(routes::users::routes(self.recorder.clone()))
                    .merge(routes::actions::routes(self.recorder.clone())),
            )
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = format!("{}:{}", self.bind_address, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RewardError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!("API server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RewardError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}
