//! Error types for the reward daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway::GatewayError;
use ledger::LedgerError;
use progression::Amount;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardError {
    #[error("Lesson already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Already checked in today: {0}")]
    AlreadyCheckedInToday(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient balance: {available} available, {required} required")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("Gateway send failed: {0}")]
    GatewaySendFailure(GatewayError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RewardError>;

impl RewardError {
    /// Rejections caused by the caller repeating an action.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RewardError::AlreadyCompleted(_) | RewardError::AlreadyCheckedInToday(_))
    }
}

impl From<LedgerError> for RewardError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateCompletion { user, lesson } => {
                RewardError::AlreadyCompleted(format!("{} already completed {}", user, lesson))
            }
            LedgerError::DuplicateCheckin { user, date } => {
                RewardError::AlreadyCheckedInToday(format!("{} on {}", user, date))
            }
            LedgerError::NotFound(what) => RewardError::NotFound(what),
            other => RewardError::Ledger(other),
        }
    }
}

impl From<GatewayError> for RewardError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidAddress(msg) => RewardError::InvalidInput(msg),
            other => RewardError::Gateway(other),
        }
    }
}

impl IntoResponse for RewardError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            RewardError::AlreadyCompleted(_) => (StatusCode::CONFLICT, "Already completed"),
            RewardError::AlreadyCheckedInToday(_) => (StatusCode::CONFLICT, "Already checked in today"),
            RewardError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            RewardError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
            RewardError::InsufficientBalance { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Insufficient balance"),
            RewardError::GatewaySendFailure(_) | RewardError::Gateway(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Gateway error")
            }
            RewardError::Ledger(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
            RewardError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            RewardError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO error"),
            RewardError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": error_message,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
