//! Command-line surface of the bootstrapper.
//!
//! `run` (the default) performs the full bootstrap and ends in the handoff.
//! `check` and `probe` are read-only helpers for operators: they neither
//! write the credential file nor start anything.

use clap::{Parser, Subcommand};
use shared_utils::config::{BootstrapConfig, ConfigError};
use shared_utils::credentials::Credentials;
use shared_utils::handoff::EntryPoint;
use shared_utils::logging::{self, LogOptions};
use shared_utils::tunnel::{InterfaceProbe, SystemProbe, VpnCommand};
use shared_utils::{BootstrapError, Bootstrapper};
use std::path::PathBuf;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info};

/// VPN tunnel bootstrapper
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", env = "BOOTSTRAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overrides the configuration file
    #[arg(short, long, env = "BOOTSTRAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "BOOTSTRAP_JSON_LOGS")]
    json_logs: bool,

    /// Also write logs to daily files in this directory
    #[arg(long, value_name = "DIR", env = "BOOTSTRAP_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Abort when the tunnel interface never appears
    #[arg(long, env = "BOOTSTRAP_REQUIRE_TUNNEL")]
    require_tunnel: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Provision credentials, start the VPN, wait for the tunnel, hand off
    Run,
    /// Validate configuration and credentials without side effects
    Check,
    /// Report whether the tunnel interface is currently up
    Probe,
}

/// Error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bootstrap error
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Async runtime could not be built
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::Bootstrap(e) => e.exit_code(),
            CliError::Runtime(_) => 1,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Run the CLI application and return the process exit status.
pub fn run() -> i32 {
    let cli = Cli::parse();

    let config = BootstrapConfig::load_or_default(cli.config.as_deref()).map(|mut config| {
        if cli.require_tunnel {
            config.readiness.require_tunnel = true;
        }
        config
    });

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    logging::init_logging(LogOptions {
        level: logging::parse_level(&level),
        json_format: cli.json_logs,
        log_to_file: cli.log_dir.is_some(),
        log_dir: cli
            .log_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_else(|| LogOptions::default().log_dir),
        ..Default::default()
    });

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("Failed to load configuration: {}", err);
            return 1;
        }
    };
    debug!(?config, "Configuration loaded");

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => bootstrap(config),
        Commands::Check => check(&config),
        Commands::Probe => probe(&config),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            err.exit_code()
        }
    }
}

fn runtime() -> CliResult<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// Full bootstrap. On Unix a successful handoff does not return.
fn bootstrap(config: BootstrapConfig) -> CliResult<i32> {
    info!("Starting tunnel bootstrap");
    let bootstrapper = Bootstrapper::system(config);

    // The runtime and its threads must be gone before the exec.
    {
        let runtime = runtime()?;
        runtime.block_on(bootstrapper.prepare(|key| std::env::var(key).ok()))?;
    }

    Ok(bootstrapper.hand_off()?)
}

/// Validate everything `run` would need and print a redacted summary.
fn check(config: &BootstrapConfig) -> CliResult<i32> {
    Credentials::from_env()?;

    let command = VpnCommand::from_config(&config.vpn);
    let entry = EntryPoint::from_config(&config.scraper);

    println!("credentials:    present");
    println!("auth file:      {}", config.vpn.auth_file.display());
    println!("vpn command:    {}", command);
    println!(
        "readiness:      {} x{} every {}s{}",
        config.readiness.interface,
        config.readiness.max_attempts,
        config.readiness.interval_secs,
        if config.readiness.require_tunnel {
            " (required)"
        } else {
            ""
        }
    );
    println!("entry point:    {}", entry);

    Ok(0)
}

/// Probe the configured interface once.
fn probe(config: &BootstrapConfig) -> CliResult<i32> {
    let interface = &config.readiness.interface;
    let up = runtime()?.block_on(SystemProbe.interface_exists(interface));

    println!("{}: {}", interface, if up { "up" } else { "down" });
    Ok(if up { 0 } else { 1 })
}
