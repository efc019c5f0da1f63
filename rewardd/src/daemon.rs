use crate::api::ApiServer;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, GatewayConfig, GatewayKind};
use crate::error::{Result, RewardError};
use crate::payout::{CycleReport, PayoutProcessor};
use crate::recorder::ActionRecorder;
use crate::ui;
use gateway::{JsonRpcGateway, MemoryGateway, WalletGateway};
use ledger::{Catalog, LedgerStore, SqliteLedger};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn WalletGateway>> {
    let gateway: Arc<dyn WalletGateway> = match config.kind {
        GatewayKind::Memory => {
            warn!("In-memory wallet gateway selected: payouts are simulated and no tokens leave the wallet");
            Arc::new(MemoryGateway::new(&config.wallet_address, config.memory_balance)?)
        }
        GatewayKind::JsonRpc => Arc::new(JsonRpcGateway::new(
            &config.url,
            &config.wallet_address,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )?),
    };
    Ok(gateway)
}

pub struct Daemon {
    config: Config,
    shutdown_tx: broadcast::Sender<()>,
    ledger: Arc<SqliteLedger>,
    recorder: Arc<ActionRecorder>,
    processor: Arc<PayoutProcessor>,
}

impl Daemon {
    /// Open and migrate the ledger, seed the catalog and wire the services.
    pub async fn new(config: Config) -> Result<Self> {
        ui::print_section("Initializing Components");
        let (shutdown_tx, _) = broadcast::channel(1);

        info!("Opening ledger at {:?}", config.database.path);
        let ledger = Arc::new(SqliteLedger::open(&config.database.path).await?);
        ledger.migrate().await?;
        ledger.seed_catalog(&Catalog::standard()).await?;
        ui::print_status("✓", "Ledger ready", ui::StatusType::Success);

        let gateway = build_gateway(&config.gateway)?;
        info!("Paying out from {}", gateway.address());
        if config.gateway.kind == GatewayKind::Memory {
            ui::print_status(
                "⚠",
                "In-memory wallet gateway: payouts are simulated (development only)",
                ui::StatusType::Warning,
            );
        } else {
            ui::print_status("✓", "Wallet gateway configured", ui::StatusType::Success);
        }

        let store: Arc<dyn LedgerStore> = ledger.clone();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let recorder = Arc::new(ActionRecorder::new(
            store.clone(),
            clock.clone(),
            config.rewards.checkin.clone(),
        ));
        let processor = Arc::new(PayoutProcessor::new(store, gateway, clock, config.payout.settings()));

        Ok(Self {
            config,
            shutdown_tx,
            ledger,
            recorder,
            processor,
        })
    }

    pub fn recorder(&self) -> Arc<ActionRecorder> {
        self.recorder.clone()
    }

    /// Serve the API and run payouts until Ctrl+C.
    pub async fn run(self) -> Result<()> {
        ui::print_section("Starting Services");

        let payout = self.processor.clone().spawn();
        ui::print_status("✓", "Payout processor running", ui::StatusType::Success);

        let server = ApiServer::new(
            self.recorder.clone(),
            &self.config.server.bind_address,
            self.config.server.port,
        );
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let server_handle = tokio::spawn(async move {
            server
                .start(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
        });

        ui::print_status("ℹ", "Press Ctrl+C to stop the daemon", ui::StatusType::Info);
        self.wait_for_shutdown().await;

        let served = server_handle
            .await
            .map_err(|e| RewardError::Internal(format!("API server task failed: {}", e)))?;
        payout.shutdown().await;
        self.ledger.close().await;
        info!("All components stopped");

        served
    }

    pub async fn payout_once(&self) -> Result<CycleReport> {
        self.processor.run_cycle().await
    }

    async fn wait_for_shutdown(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::select! {
            _ = signal::ctrl_c() => {
                ui::print_status("ℹ", "Received Ctrl+C, shutting down gracefully...", ui::StatusType::Warning);
                info!("Received Ctrl+C, shutting down");
            }
            _ = shutdown_rx.recv() => {
                info!("Received shutdown signal");
            }
        }

        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn memory_gateway_from_config() {
        let config = GatewayConfig {
            kind: GatewayKind::Memory,
            ..Default::default()
        };
        let gateway = build_gateway(&config).unwrap();
        assert_eq!(gateway.address(), "0x0000000000000000000000000000000000000001");
        assert_eq!(gateway.get_balance().await.unwrap().to_string(), "1000");
    }

    #[test]
    fn default_config_builds_live_gateway() {
        let config = GatewayConfig::default();
        assert_eq!(config.kind, GatewayKind::JsonRpc);
        let gateway = build_gateway(&config).unwrap();
        assert_eq!(gateway.address(), "0x0000000000000000000000000000000000000001");
    }

    #[test]
    fn json_rpc_gateway_needs_websocket_url() {
        let config = GatewayConfig {
            kind: GatewayKind::JsonRpc,
            url: "http://localhost:8545".to_string(),
            ..Default::default()
        };
        assert!(matches!(build_gateway(&config), Err(RewardError::Gateway(_))));
    }

    #[tokio::test]
    async fn new_daemon_seeds_catalog() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("nested").join("rewards.db");
        config.gateway.kind = GatewayKind::Memory;

        let daemon = assert_ok!(Daemon::new(config).await);
        assert_eq!(daemon.recorder().list_lessons().await.unwrap().len(), 6);

        let report = daemon.payout_once().await.unwrap();
        assert_eq!(report.scanned, 0);
    }
}
