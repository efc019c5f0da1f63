//! In-process gateway with a scriptable balance, for development and tests.

use crate::address::normalize_address;
use crate::error::{GatewayError, GatewayResult};
use crate::wallet::{TxHash, WalletGateway};
use async_trait::async_trait;
use parking_lot::Mutex;
use progression::Amount;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub to: String,
    pub amount: Amount,
    pub hash: TxHash,
}

#[derive(Debug, Default)]
struct MemoryState {
    balance: Amount,
    nonce: u64,
    transfers: Vec<Transfer>,
    send_failures: VecDeque<GatewayError>,
    balance_failure: Option<GatewayError>,
    send_delay: Option<Duration>,
}

pub struct MemoryGateway {
    address: String,
    gas_cost: Amount,
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new(address: &str, balance: Amount) -> GatewayResult<Self> {
        Ok(Self {
            address: normalize_address(address)?,
            gas_cost: Amount::ZERO,
            state: Mutex::new(MemoryState {
                balance,
                ..Default::default()
            }),
        })
    }

    /// Charge `gas_cost` on top of each transfer.
    pub fn with_gas_cost(mut self, gas_cost: Amount) -> Self {
        self.gas_cost = gas_cost;
        self
    }

    pub fn balance(&self) -> Amount {
        self.state.lock().balance
    }

    pub fn set_balance(&self, balance: Amount) {
        self.state.lock().balance = balance;
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.lock().transfers.clone()
    }

    /// Fail the next `send_native` call with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next_send(&self, error: GatewayError) {
        self.state.lock().send_failures.push_back(error);
    }

    /// Fail every `get_balance` call until cleared with `None`.
    pub fn set_balance_failure(&self, error: Option<GatewayError>) {
        self.state.lock().balance_failure = error;
    }

    /// Delay every send, e.g. to exercise caller timeouts.
    pub fn set_send_delay(&self, delay: Option<Duration>) {
        self.state.lock().send_delay = delay;
    }

    fn transfer_hash(&self, to: &str, amount: Amount, nonce: u64) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(self.address.as_bytes());
        hasher.update(to.as_bytes());
        hasher.update(amount.wei().to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        TxHash::new(format!("0x{}", hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl WalletGateway for MemoryGateway {
    fn address(&self) -> &str {
        &self.address
    }

    async fn get_balance(&self) -> GatewayResult<Amount> {
        let state = self.state.lock();
        match &state.balance_failure {
            Some(err) => Err(err.clone()),
            None => Ok(state.balance),
        }
    }

    async fn send_native(&self, to: &str, amount: Amount) -> GatewayResult<TxHash> {
        let to = normalize_address(to)?;

        let delay = self.state.lock().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some(err) = state.send_failures.pop_front() {
            return Err(err);
        }

        let required = amount
            .checked_add(self.gas_cost)
            .ok_or_else(|| GatewayError::Rejected("amount overflow".to_string()))?;
        if state.balance < required {
            return Err(GatewayError::Rejected(format!(
                "insufficient funds: balance {} < {}",
                state.balance, required
            )));
        }

        let hash = self.transfer_hash(&to, amount, state.nonce);
        state.nonce += 1;
        state.balance = state.balance.saturating_sub(required);
        state.transfers.push(Transfer {
            to: to.clone(),
            amount,
            hash: hash.clone(),
        });

        debug!("Memory transfer of {} to {}: {}", amount, to, hash);
        Ok(hash)
    }
}
