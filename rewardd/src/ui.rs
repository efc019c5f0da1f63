//! Console output for the daemon's startup and shutdown

use crate::config::{Config, GatewayKind};
use crate::payout::CycleReport;

/// ANSI color codes for terminal output
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const BRIGHT_GREEN: &str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
}

/// Print startup banner
pub fn print_banner(version: &str) {
    println!();
    println!("{}╔══════════════════════════════════════════════════════════════╗{}", colors::BRIGHT_CYAN, colors::RESET);
    println!(
        "{}║{}          {}REWARDD - REWARD LEDGER & PAYOUTS v{:<10}{}         {}║{}",
        colors::BRIGHT_CYAN,
        colors::RESET,
        colors::BOLD,
        version,
        colors::RESET,
        colors::BRIGHT_CYAN,
        colors::RESET
    );
    println!("{}╚══════════════════════════════════════════════════════════════╝{}", colors::BRIGHT_CYAN, colors::RESET);
    println!();
}

/// Status types for colored output
#[derive(Debug, Clone, Copy)]
pub enum StatusType {
    Success,
    Info,
    Warning,
    Error,
}

/// Print status line with icon and color
pub fn print_status(icon: &str, message: &str, status: StatusType) {
    let color = match status {
        StatusType::Success => colors::BRIGHT_GREEN,
        StatusType::Info => colors::BRIGHT_CYAN,
        StatusType::Warning => colors::BRIGHT_YELLOW,
        StatusType::Error => colors::BRIGHT_RED,
    };

    println!("{}[{}]{} {}{}{}", color, icon, colors::RESET, color, message, colors::RESET);
}

/// Print a section header
pub fn print_section(title: &str) {
    println!();
    println!("{}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{}", colors::DIM, colors::RESET);
    println!("{}  {}{}{}", colors::BRIGHT_CYAN, colors::BOLD, title, colors::RESET);
    println!("{}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{}", colors::DIM, colors::RESET);
    println!();
}

/// Print key-value pair in a formatted way
pub fn print_kv(key: &str, value: &str) {
    println!(
        "  {}{}:{} {}{}{}",
        colors::BRIGHT_WHITE,
        key,
        colors::RESET,
        colors::BRIGHT_CYAN,
        value,
        colors::RESET
    );
}

pub fn print_config_summary(config: &Config) {
    print_section("Configuration");

    print_kv("API", &format!("{}:{}", config.server.bind_address, config.server.port));
    print_kv("Database", &config.database.path.display().to_string());
    let gateway = match config.gateway.kind {
        GatewayKind::Memory => format!("in-memory ({} available)", config.gateway.memory_balance),
        GatewayKind::JsonRpc => config.gateway.url.clone(),
    };
    print_kv("Gateway", &gateway);
    print_kv("Payout Wallet", &config.gateway.wallet_address);
    print_kv("Payout Interval", &format!("{}s", config.payout.interval_secs));
    print_kv("Gas Reserve", &config.payout.gas_reserve.to_string());
    let retry = if config.payout.retry_failed {
        format!(
            "up to {} attempts, {}s backoff",
            config.payout.max_attempts, config.payout.retry_backoff_secs
        )
    } else {
        "Disabled".to_string()
    };
    print_kv("Retries", &retry);
}

pub fn print_cycle_report(report: &CycleReport) {
    print_section("Payout Cycle");

    print_kv("Due", &report.scanned.to_string());
    print_kv("Sent", &format!("{} ({})", report.sent, report.paid));
    print_kv("Failed", &report.failed.to_string());
    print_kv("Claims Reconciled", &report.reconciled.to_string());
    if let Some(balance) = report.starting_balance {
        print_kv("Starting Balance", &balance.to_string());
    }
    if let Some(remaining) = report.remaining_estimate {
        print_kv("Remaining (est.)", &remaining.to_string());
    }
}
