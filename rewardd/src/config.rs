//! Daemon configuration: TOML file, then environment, then CLI flags.

use crate::cli::Args;
use crate::error::{Result, RewardError};
use crate::payout::PayoutSettings;
use progression::{Amount, CheckinPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub payout: PayoutConfig,
    pub rewards: RewardsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Payouts go to a live node unless a development run opts into the
/// in-memory gateway with `kind = "memory"` or `--dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Memory,
    JsonRpc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub kind: GatewayKind,
    pub url: String,
    pub wallet_address: String,
    pub request_timeout_secs: u64,
    /// Starting balance of the in-memory gateway.
    pub memory_balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    pub interval_secs: u64,
    pub gas_reserve: Amount,
    pub send_timeout_secs: u64,
    pub retry_failed: bool,
    pub max_attempts: u32,
    pub retry_backoff_secs: u64,
    pub max_backoff_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    pub checkin: CheckinPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/rewards.db"),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::JsonRpc,
            url: "ws://localhost:8546".to_string(),
            wallet_address: "0x0000000000000000000000000000000000000001".to_string(),
            request_timeout_secs: 10,
            memory_balance: Amount::from_tokens(1_000),
        }
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            gas_reserve: Amount::from_wei(1_000_000_000_000_000), // 0.001
            send_timeout_secs: 15,
            retry_failed: true,
            max_attempts: 5,
            retry_backoff_secs: 60,
            max_backoff_secs: 3_600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PayoutConfig {
    pub fn settings(&self) -> PayoutSettings {
        PayoutSettings {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            gas_reserve: self.gas_reserve,
            send_timeout: Duration::from_secs(self.send_timeout_secs.max(1)),
            retry_failed: self.retry_failed,
            max_attempts: self.max_attempts.max(1),
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }
}

impl Config {
    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RewardError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Override with `DATABASE_URL` and `GATEWAY_URL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")).unwrap_or(url.as_str());
            self.database.path = PathBuf::from(path);
        }

        if let Some(url) = lookup("GATEWAY_URL") {
            self.gateway.url = url;
            self.gateway.kind = GatewayKind::JsonRpc;
        }
    }

    /// Override config with CLI arguments
    pub fn apply_cli_overrides(&mut self, args: &Args) {
        if let Some(database) = &args.database {
            self.database.path = database.clone();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }

        if args.log_json {
            self.logging.json = true;
        }

        if let Some(interval) = args.payout_interval {
            self.payout.interval_secs = interval;
        }

        if args.dev {
            self.gateway.kind = GatewayKind::Memory;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.payout.interval_secs, 30);
        assert_eq!(config.payout.gas_reserve.to_string(), "0.001");
        assert_eq!(config.rewards.checkin, CheckinPolicy::default());
    }

    #[test]
    fn default_gateway_is_live_node() {
        assert_eq!(Config::default().gateway.kind, GatewayKind::JsonRpc);

        let from_file = Config::from_toml("[server]\nport = 9000").unwrap();
        assert_eq!(from_file.gateway.kind, GatewayKind::JsonRpc);
        assert_eq!(from_file.gateway.url, "ws://localhost:8546");
    }

    #[test]
    fn memory_gateway_needs_opt_in() {
        let config = Config::from_toml("[gateway]\nkind = \"memory\"").unwrap();
        assert_eq!(config.gateway.kind, GatewayKind::Memory);

        let mut config = Config::default();
        config.apply_cli_overrides(&Args::default());
        assert_eq!(config.gateway.kind, GatewayKind::JsonRpc);

        config.apply_cli_overrides(&Args {
            dev: true,
            ..Default::default()
        });
        assert_eq!(config.gateway.kind, GatewayKind::Memory);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9000

            [payout]
            gas_reserve = "0.002"
            retry_failed = false

            [gateway]
            kind = "json_rpc"
            url = "wss://node.example:8546"

            [rewards.checkin]
            max_xp = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.payout.gas_reserve.to_string(), "0.002");
        assert!(!config.payout.retry_failed);
        assert_eq!(config.payout.max_attempts, 5);
        assert_eq!(config.gateway.kind, GatewayKind::JsonRpc);
        assert_eq!(config.rewards.checkin.max_xp, 40);
        assert_eq!(config.rewards.checkin.base_xp, 10);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = Config::from_toml("[payout]\ngas_reserve = \"-1\"").unwrap_err();
        assert!(matches!(err, RewardError::Config(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/rewardd.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn env_then_cli_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite:/var/lib/rewardd/rewards.db"),
            ("GATEWAY_URL", "ws://10.0.0.5:8546"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.database.path, PathBuf::from("/var/lib/rewardd/rewards.db"));
        assert_eq!(config.gateway.kind, GatewayKind::JsonRpc);
        assert_eq!(config.gateway.url, "ws://10.0.0.5:8546");

        let args = Args {
            database: Some(PathBuf::from("/tmp/override.db")),
            port: Some(7000),
            log_json: true,
            payout_interval: Some(3),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.database.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.server.port, 7000);
        assert!(config.logging.json);
        assert_eq!(config.payout.settings().interval, Duration::from_secs(3));
    }
}
