use anyhow::Context;
use rewardd::cli::{self, Command};
use rewardd::config::LoggingConfig;
use rewardd::{ui, Config, Daemon};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();

    // Load configuration (defaults unless a config file is provided)
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    config.apply_cli_overrides(&args);

    init_logging(&config.logging);

    ui::print_banner(env!("CARGO_PKG_VERSION"));
    ui::print_config_summary(&config);

    let daemon = match Daemon::new(config).await {
        Ok(d) => d,
        Err(e) => {
            ui::print_status("✗", &format!("Failed to initialize daemon: {}", e), ui::StatusType::Error);
            return Err(e).context("initializing daemon");
        }
    };

    match args.command() {
        Command::Serve => {
            daemon.run().await.context("running daemon")?;
            ui::print_status("✓", "rewardd stopped gracefully", ui::StatusType::Success);
            info!("rewardd stopped gracefully");
        }
        Command::Migrate => {
            ui::print_status("✓", "Schema migrated and catalog seeded", ui::StatusType::Success);
        }
        Command::PayoutOnce => {
            let report = daemon.payout_once().await.context("running payout cycle")?;
            ui::print_cycle_report(&report);
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = fmt().with_env_filter(filter).with_target(true).with_thread_ids(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
