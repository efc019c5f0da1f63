//! Reward ledger: durable user progression, catalog and reward transactions.

pub mod catalog;
pub mod db;
pub mod errors;
pub mod models;
pub mod queries;
pub mod schema;
pub mod store;

pub use catalog::Catalog;
pub use db::SqliteLedger;
pub use errors::{LedgerError, LedgerResult};
pub use models::*;
pub use store::{
    LedgerStore, NewCheckin, NewRewardTransaction, PayoutSummary, ProgressAdvance, ProgressTick, StatsChange,
    StatsUpdate, StatusTransition,
};
