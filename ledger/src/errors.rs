use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Check-in already recorded for {user} on {date}")]
    DuplicateCheckin { user: String, date: NaiveDate },

    #[error("Lesson {lesson} already completed by {user}")]
    DuplicateCompletion { user: String, lesson: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// True for uniqueness violations surfaced as typed duplicates.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            LedgerError::DuplicateCheckin { .. } | LedgerError::DuplicateCompletion { .. }
        )
    }
}

/// Whether a raw sqlx error is a UNIQUE / PRIMARY KEY constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
