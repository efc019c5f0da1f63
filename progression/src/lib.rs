//! Progression engine: levels, streaks, achievement rules and reward schedules.
//!
//! Everything here is pure and deterministic; persistence and payouts live in
//! the `ledger` and `rewardd` crates.

pub mod achievement;
pub mod amount;
pub mod level;
pub mod policy;
pub mod streak;

pub use achievement::{evaluate_achievement, ProgressSnapshot, Requirement};
pub use amount::{Amount, AmountError, DECIMALS, WEI_PER_TOKEN};
pub use level::{level_from_xp, xp_bounds, LevelProgress};
pub use policy::{CheckinPolicy, LessonDifficulty};
pub use streak::consecutive_checkins;
