//! Payout processor: periodically pays out pending rewards from the custodial
//! wallet and records each outcome in the ledger.

use crate::clock::Clock;
use crate::error::{Result, RewardError};
use chrono::{DateTime, Utc};
use gateway::{GatewayError, WalletGateway};
use ledger::{LedgerStore, RewardTransaction, StatusTransition};
use progression::Amount;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutSettings {
    pub interval: Duration,
    /// Held back from the wallet balance for every transfer.
    pub gas_reserve: Amount,
    pub send_timeout: Duration,
    pub retry_failed: bool,
    /// Total send attempts before a row stays failed for good.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for PayoutSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            gas_reserve: Amount::from_wei(1_000_000_000_000_000),
            send_timeout: Duration::from_secs(15),
            retry_failed: true,
            max_attempts: 5,
            retry_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(3600),
        }
    }
}

impl PayoutSettings {
    /// When a row that has now failed `attempts` times should be tried again,
    /// or `None` if it should not.
    pub fn next_retry(&self, attempts: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.retry_failed || attempts >= self.max_attempts {
            return None;
        }

        let exponent = attempts.saturating_sub(1).min(31);
        let delay = self
            .retry_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);
        let delay = chrono::Duration::from_std(delay).ok()?;
        now.checked_add_signed(delay)
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub scanned: usize,
    pub sent: usize,
    pub failed: usize,
    pub paid: Amount,
    pub starting_balance: Option<Amount>,
    pub remaining_estimate: Option<Amount>,
    /// Claim flags repaired from earlier cycles.
    pub reconciled: usize,
}

pub struct PayoutProcessor {
    store: Arc<dyn LedgerStore>,
    gateway: Arc<dyn WalletGateway>,
    clock: Arc<dyn Clock>,
    settings: PayoutSettings,
}

impl PayoutProcessor {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        gateway: Arc<dyn WalletGateway>,
        clock: Arc<dyn Clock>,
        settings: PayoutSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &PayoutSettings {
        &self.settings
    }

    /// Run one payout pass over every due row, oldest first.
    ///
    /// The balance is read once and decremented locally by each send plus the
    /// gas reserve. A failed balance read leaves every row untouched for the
    /// next cycle. Per-row failures are recorded and never abort the pass.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport {
            reconciled: self.reconcile_claims().await?,
            ..Default::default()
        };

        let due = self.store.list_pending_reward_transactions(self.clock.now()).await?;
        if due.is_empty() {
            debug!("No reward transactions due");
            return Ok(report);
        }
        report.scanned = due.len();

        let balance = match self.fetch_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Skipping payout cycle, balance unavailable: {}", e);
                return Ok(report);
            }
        };
        report.starting_balance = Some(balance);
        info!("Processing {} reward transactions (balance {})", due.len(), balance);

        let mut running = balance;
        for tx in &due {
            match self.process(tx, &mut running).await {
                Ok(Some(paid)) => {
                    report.sent += 1;
                    report.paid = report.paid.saturating_add(paid);
                }
                Ok(None) => report.failed += 1,
                Err(e) => {
                    error!("Failed to record payout of {}: {}", tx.id, e);
                    report.failed += 1;
                }
            }
        }
        report.remaining_estimate = Some(running);

        info!(
            "Payout cycle done: {} sent ({}), {} failed, ~{} remaining",
            report.sent, report.paid, report.failed, running
        );
        Ok(report)
    }

    /// Returns the amount paid, or `None` if the row was marked failed.
    async fn process(&self, tx: &RewardTransaction, running: &mut Amount) -> Result<Option<Amount>> {
        let required = tx.amount.saturating_add(self.settings.gas_reserve);
        if *running < required {
            let reason = RewardError::InsufficientBalance {
                available: *running,
                required,
            };
            self.record_failure(tx, reason.to_string()).await?;
            return Ok(None);
        }

        let sent = tokio::time::timeout(self.settings.send_timeout, self.gateway.send_native(&tx.user_address, tx.amount))
            .await
            .unwrap_or_else(|_| Err(GatewayError::Timeout(self.settings.send_timeout.as_millis() as u64)));

        match sent {
            Ok(hash) => {
                *running = running.saturating_sub(required);
                let now = self.clock.now();
                self.store
                    .update_reward_transaction(
                        &tx.id,
                        StatusTransition::Sent {
                            hash: hash.into_string(),
                            sent_at: now,
                        },
                    )
                    .await?;
                info!("Paid {} to {} for {} reward {}", tx.amount, tx.user_address, tx.reward_type, tx.id);

                if let Err(e) = self.propagate_claim(tx, now).await {
                    warn!("Claim for {} not propagated yet: {}", tx.id, e);
                }
                Ok(Some(tx.amount))
            }
            Err(e) => {
                self.record_failure(tx, RewardError::GatewaySendFailure(e).to_string())
                    .await?;
                Ok(None)
            }
        }
    }

    async fn record_failure(&self, tx: &RewardTransaction, reason: String) -> Result<()> {
        let attempts = tx.attempts + 1;
        let retry_at = self.settings.next_retry(attempts, self.clock.now());
        match retry_at {
            Some(at) => warn!("Payout {} failed (attempt {}), retrying at {}: {}", tx.id, attempts, at, reason),
            None => warn!("Payout {} failed permanently after {} attempts: {}", tx.id, attempts, reason),
        }

        self.store
            .update_reward_transaction(&tx.id, StatusTransition::Failed { reason, retry_at })
            .await?;
        Ok(())
    }

    async fn propagate_claim(&self, tx: &RewardTransaction, at: DateTime<Utc>) -> Result<()> {
        if let Some(reward_id) = &tx.reward_id {
            self.store.mark_reward_claimed(tx.reward_type, reward_id, at).await?;
        }
        self.store.mark_claim_propagated(&tx.id).await?;
        Ok(())
    }

    /// Set claim flags for rows sent in a cycle that stopped before it could.
    async fn reconcile_claims(&self) -> Result<usize> {
        let mut reconciled = 0;
        for tx in self.store.list_unpropagated_claims().await? {
            let at = tx.sent_at.unwrap_or_else(|| self.clock.now());
            match self.propagate_claim(&tx, at).await {
                Ok(()) => reconciled += 1,
                Err(e) => warn!("Failed to reconcile claim for {}: {}", tx.id, e),
            }
        }
        if reconciled > 0 {
            info!("Reconciled {} reward claims", reconciled);
        }
        Ok(reconciled)
    }

    async fn fetch_balance(&self) -> std::result::Result<Amount, GatewayError> {
        tokio::time::timeout(self.settings.send_timeout, self.gateway.get_balance())
            .await
            .unwrap_or_else(|_| Err(GatewayError::Timeout(self.settings.send_timeout.as_millis() as u64)))
    }

    /// Run cycles on the configured interval until shut down.
    pub fn spawn(self: Arc<Self>) -> PayoutHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            info!("Starting payout processor (every {:?})", self.settings.interval);
            let mut ticker = interval(self.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            error!("Payout cycle failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Payout processor stopping");
                        break;
                    }
                }
            }
        });

        PayoutHandle { shutdown_tx, handle }
    }
}

pub struct PayoutHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl PayoutHandle {
    /// Stop after the cycle in flight, if any, finishes.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            error!("Payout processor task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use gateway::MemoryGateway;
    use ledger::{
        Catalog, NewCheckin, NewRewardTransaction, RewardStatus, RewardType, SqliteLedger,
    };
    use tempfile::{tempdir, TempDir};

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";
    const ALICE: &str = "0x00000000000000000000000000000000000a11ce";

    struct Harness {
        _dir: TempDir,
        store: Arc<SqliteLedger>,
        gateway: Arc<MemoryGateway>,
        clock: Arc<FixedClock>,
        processor: PayoutProcessor,
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    async fn harness(balance: &str, settings: PayoutSettings) -> Harness {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteLedger::open(&dir.path().join("rewards.db")).await.unwrap());
        store.migrate().await.unwrap();
        store.seed_catalog(&Catalog::standard()).await.unwrap();
        let gateway = Arc::new(
            MemoryGateway::new(WALLET, amount(balance))
                .unwrap()
                .with_gas_cost(settings.gas_reserve),
        );
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()));
        let processor = PayoutProcessor::new(store.clone(), gateway.clone(), clock.clone(), settings);
        Harness {
            _dir: dir,
            store,
            gateway,
            clock,
            processor,
        }
    }

    async fn queue(h: &Harness, value: &str) -> RewardTransaction {
        h.store
            .create_reward_transaction(NewRewardTransaction {
                user_address: ALICE.to_string(),
                reward_type: RewardType::DailyChallenge,
                reward_id: None,
                amount: amount(value),
            })
            .await
            .unwrap()
    }

    async fn reload(h: &Harness, id: &str) -> RewardTransaction {
        h.store
            .list_reward_transactions(ALICE)
            .await
            .unwrap()
            .into_iter()
            .find(|tx| tx.id == id)
            .unwrap()
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let settings = PayoutSettings {
            retry_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(200),
            max_attempts: 5,
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let delay = |attempts| settings.next_retry(attempts, now).map(|at| (at - now).num_seconds());

        assert_eq!(delay(1), Some(60));
        assert_eq!(delay(2), Some(120));
        assert_eq!(delay(3), Some(200));
        assert_eq!(delay(5), None);

        let no_retry = PayoutSettings {
            retry_failed: false,
            ..Default::default()
        };
        assert_eq!(no_retry.next_retry(1, now), None);
    }

    #[tokio::test]
    async fn running_balance_includes_gas() {
        let h = harness("0.05", PayoutSettings::default()).await;
        let first = queue(&h, "0.03").await;
        let second = queue(&h, "0.03").await;

        let report = h.processor.run_cycle().await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.paid, amount("0.03"));
        assert_eq!(report.remaining_estimate, Some(amount("0.019")));

        let first = reload(&h, &first.id).await;
        assert_eq!(first.status, RewardStatus::Sent);
        assert!(first.transaction_hash.is_some());
        assert!(first.claim_propagated);

        let second = reload(&h, &second.id).await;
        assert_eq!(second.status, RewardStatus::Failed);
        assert_eq!(second.attempts, 1);
        assert!(second.last_error.unwrap().contains("Insufficient balance"));
        assert_eq!(h.gateway.transfers().len(), 1);
    }

    #[tokio::test]
    async fn failed_rows_retry_after_backoff() {
        let h = harness("0.01", PayoutSettings::default()).await;
        let tx = queue(&h, "0.5").await;

        h.processor.run_cycle().await.unwrap();
        let failed = reload(&h, &tx.id).await;
        assert_eq!(failed.status, RewardStatus::Failed);
        assert_eq!(failed.next_attempt_at, Some(h.clock.now() + chrono::Duration::seconds(60)));

        // Not due yet, even with funds.
        h.gateway.set_balance(amount("10"));
        let report = h.processor.run_cycle().await.unwrap();
        assert_eq!(report.scanned, 0);

        h.clock.advance(chrono::Duration::seconds(61));
        let report = h.processor.run_cycle().await.unwrap();
        assert_eq!(report.sent, 1);
        let sent = reload(&h, &tx.id).await;
        assert_eq!(sent.status, RewardStatus::Sent);
        assert_eq!(sent.attempts, 2);
        assert_eq!(sent.last_error, None);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let settings = PayoutSettings {
            max_attempts: 2,
            ..Default::default()
        };
        let h = harness("0", settings).await;
        let tx = queue(&h, "1").await;

        h.processor.run_cycle().await.unwrap();
        h.clock.advance(chrono::Duration::hours(1));
        h.processor.run_cycle().await.unwrap();

        let failed = reload(&h, &tx.id).await;
        assert_eq!(failed.attempts, 2);
        assert_eq!(failed.next_attempt_at, None);

        h.clock.advance(chrono::Duration::days(1));
        assert_eq!(h.processor.run_cycle().await.unwrap().scanned, 0);
        let summary = h.store.payout_summary(ALICE).await.unwrap();
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.retrying_count, 0);
    }

    #[tokio::test]
    async fn balance_failure_leaves_rows_pending() {
        let h = harness("1", PayoutSettings::default()).await;
        let tx = queue(&h, "0.1").await;
        h.gateway.set_balance_failure(Some(GatewayError::Network("node down".into())));

        let report = h.processor.run_cycle().await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.starting_balance, None);

        let untouched = reload(&h, &tx.id).await;
        assert_eq!(untouched.status, RewardStatus::Pending);
        assert_eq!(untouched.attempts, 0);
    }

    #[tokio::test]
    async fn send_errors_and_timeouts_fail_the_row_only() {
        let settings = PayoutSettings {
            send_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let h = harness("1", settings).await;
        let rejected = queue(&h, "0.1").await;
        h.gateway.fail_next_send(GatewayError::Rpc {
            code: -32000,
            message: "nonce too low".into(),
        });
        let report = h.processor.run_cycle().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.remaining_estimate, Some(amount("1")));
        assert!(reload(&h, &rejected.id).await.last_error.unwrap().contains("nonce too low"));

        let slow = queue(&h, "0.1").await;
        h.gateway.set_send_delay(Some(Duration::from_millis(500)));
        let report = h.processor.run_cycle().await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.failed, 1);

        let timed_out = reload(&h, &slow.id).await;
        assert_eq!(timed_out.status, RewardStatus::Failed);
        assert!(timed_out.last_error.unwrap().contains("timed out"));
        assert!(h.gateway.transfers().is_empty());
    }

    #[tokio::test]
    async fn reconciles_claims_left_by_interrupted_cycle() {
        let h = harness("1", PayoutSettings::default()).await;
        let checkin = h
            .store
            .create_checkin(NewCheckin {
                user_address: ALICE.to_string(),
                date: h.clock.today(),
                checked_in_at: h.clock.now(),
                reward_amount: amount("0.011"),
                consecutive_days: 1,
                xp_awarded: 12,
            })
            .await
            .unwrap();
        let tx = h
            .store
            .create_reward_transaction(NewRewardTransaction {
                user_address: ALICE.to_string(),
                reward_type: RewardType::Checkin,
                reward_id: Some(checkin.id.clone()),
                amount: checkin.reward_amount,
            })
            .await
            .unwrap();

        // Sent, then the process stopped before the claim flag was written.
        h.store
            .update_reward_transaction(
                &tx.id,
                StatusTransition::Sent {
                    hash: format!("0x{}", "11".repeat(32)),
                    sent_at: h.clock.now(),
                },
            )
            .await
            .unwrap();

        let report = h.processor.run_cycle().await.unwrap();
        assert_eq!(report.reconciled, 1);
        assert_eq!(report.scanned, 0);

        let claimed = h.store.get_checkin(ALICE, h.clock.today()).await.unwrap().unwrap();
        assert!(claimed.reward_claimed);
        assert!(h.store.list_unpropagated_claims().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawned_loop_pays_and_stops() {
        let settings = PayoutSettings {
            interval: Duration::from_millis(20),
            ..Default::default()
        };
        let h = harness("1", settings).await;
        queue(&h, "0.2").await;

        let processor = Arc::new(h.processor);
        let handle = processor.clone().spawn();
        for _ in 0..100 {
            if !h.gateway.transfers().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await;

        assert_eq!(h.gateway.transfers().len(), 1);
        assert_eq!(h.store.payout_summary(ALICE).await.unwrap().sent_count, 1);
    }
}
