//! fvm-gateway: FVM reading calendar command-line tool
//!
//! Usage:
//!   fvm-gateway meters                    - List registered meters
//!   fvm-gateway next                      - Show the next reading window per meter
//!   fvm-gateway events FROM TO [--ics]    - Show reading windows in a date range
//!   fvm-gateway check                     - Verify portal credentials
//!   fvm-gateway --help                    - Show help

mod commands;

use anyhow::Context;
use chrono::NaiveDate;
use fvm_core::{Config, ControllerRegistry, MeterController};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// List locations and meters
    Meters,
    /// Next upcoming window per meter
    Next,
    /// Windows overlapping a date range
    Events {
        from: NaiveDate,
        to: NaiveDate,
        ics: bool,
    },
    /// Verify credentials
    Check,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = parse_args(&args)?;

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("fvm-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Logs go to stderr so ICS output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting fvm-gateway...");
    tracing::info!("Portal: {}", config.portal.base_url);

    let registry = ControllerRegistry::new();
    for account in &config.accounts {
        registry
            .get_or_insert(MeterController::new(config.portal.clone(), account.clone()))
            .await;
    }
    tracing::info!("Registered {} accounts", registry.len().await);

    match mode {
        RunMode::Meters => commands::list_meters(&registry).await,
        RunMode::Next => commands::show_next(&registry, &config.refresh).await,
        RunMode::Events { from, to, ics } => {
            commands::show_events(&registry, &config.refresh, from, to, ics).await
        }
        RunMode::Check => commands::check_credentials(&registry).await,
        RunMode::Help | RunMode::Version => Ok(()),
    }
}

/// Parse command line arguments (without the program name)
fn parse_args(args: &[String]) -> anyhow::Result<RunMode> {
    let mut positional = Vec::new();
    let mut ics = false;

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--ics" => ics = true,
            flag if flag.starts_with('-') => anyhow::bail!("Unknown option: {}", flag),
            _ => positional.push(arg.as_str()),
        }
    }

    match positional.as_slice() {
        [] => Ok(RunMode::Help),
        ["meters"] => Ok(RunMode::Meters),
        ["next"] => Ok(RunMode::Next),
        ["check"] => Ok(RunMode::Check),
        ["events", from, to] => {
            let from = parse_date(from)?;
            let to = parse_date(to)?;
            if to < from {
                anyhow::bail!("Range end {} is before range start {}", to, from);
            }
            Ok(RunMode::Events { from, to, ics })
        }
        ["events", ..] => anyhow::bail!("Usage: fvm-gateway events FROM TO [--ics]"),
        [command, ..] => anyhow::bail!("Unknown command: {} (see --help)", command),
    }
}

fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

/// Print help message
fn print_help() {
    println!("fvm-gateway - Fővárosi Vízművek reading calendar");
    println!();
    println!("Usage:");
    println!("  fvm-gateway meters                  List registered locations and meters");
    println!("  fvm-gateway next                    Show the next reading window per meter");
    println!("  fvm-gateway events FROM TO [--ics]  Show windows between two dates (YYYY-MM-DD)");
    println!("  fvm-gateway check                   Verify portal credentials");
    println!("  fvm-gateway --help                  Show this help message");
    println!("  fvm-gateway --version               Show version");
    println!();
    println!("Configuration is read from ./fvm.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  FVM_USERNAME          Portal login e-mail (required without fvm.toml)");
    println!("  FVM_PASSWORD          Portal password (required without fvm.toml)");
    println!("  FVM_BASE_URL          Portal root URL");
    println!("  FVM_TIMEOUT_SECS      Request timeout in seconds (default: 30)");
    println!("  FVM_MIN_REFRESH_DAYS  Minimum days between refreshes (default: 7)");
    println!("  RUST_LOG              Log filter (default: info)");
}
