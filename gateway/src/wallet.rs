//! The custodial wallet contract.

use crate::error::GatewayResult;
use async_trait::async_trait;
use progression::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single funded account that pays out native value.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// The paying account.
    fn address(&self) -> &str;

    async fn get_balance(&self) -> GatewayResult<Amount>;

    /// Transfer `amount` to `to`. Implementations serialize sends so the
    /// account nonce advances one transfer at a time.
    async fn send_native(&self, to: &str, amount: Amount) -> GatewayResult<TxHash>;
}
