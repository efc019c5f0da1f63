//! rewardd - reward ledger and payout daemon
//!
//! Records learning and engagement actions (lessons, daily check-ins, daily
//! challenges), turns them into XP, levels, achievements and pending token
//! rewards, and pays those rewards out from a custodial wallet.

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod error;
pub mod payout;
pub mod recorder;
pub mod ui;

pub use cli::Args;
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Result, RewardError};
pub use payout::{CycleReport, PayoutProcessor, PayoutSettings};
pub use recorder::{ActionOutcome, ActionRecorder};
