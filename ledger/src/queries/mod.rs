//! Query functions grouped by table family.

mod catalog;
mod progress;
mod rewards;
mod users;

pub use catalog::CatalogQueries;
pub use progress::{AchievementQueries, ChallengeQueries, CheckinQueries, LessonQueries, TaskQueries};
pub use rewards::RewardQueries;
pub use users::UserQueries;

use crate::errors::{LedgerError, LedgerResult};

pub(crate) fn to_i64(value: u64, what: &str) -> LedgerResult<i64> {
    i64::try_from(value).map_err(|_| LedgerError::InvalidData(format!("{} out of range: {}", what, value)))
}
