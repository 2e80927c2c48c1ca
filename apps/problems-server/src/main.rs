mod config;
mod routes;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use problem_details::RecoveryLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LoggingConfig};

/// Problem Details demo server
#[derive(Parser)]
#[command(name = "problems-server")]
#[command(about = "Serves demo routes whose failures are reported as RFC 7807 problems")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.config
        && !Path::new(path).is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    // 1) defaults -> 2) YAML (if provided) -> 3) env (PROBLEMS__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.override_port(port)?;
    }

    init_logging(&config.logging, cli.verbose)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn filter_directive(cfg: &LoggingConfig, verbose: u8) -> &str {
    match verbose {
        0 => cfg.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn subscriber(cfg: &LoggingConfig, verbose: u8) -> Box<dyn tracing::Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(cfg, verbose)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if cfg.json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    }
}

fn init_logging(cfg: &LoggingConfig, verbose: u8) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber(cfg, verbose))
        .context("failed to install tracing subscriber")
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    RecoveryLayer::from_config(&config.problems).context("invalid problems config")?;
    config
        .server
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("invalid bind_addr '{}'", config.server.bind_addr))?;
    println!("Configuration is valid");
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    let recovery = RecoveryLayer::from_config(&config.problems).context("invalid problems config")?;
    let app = routes::router(recovery);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(
        addr = %config.server.bind_addr,
        trace_key = ?config.problems.trace_key,
        "problems-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("problems-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn verbosity_overrides_configured_level() {
        let cfg = LoggingConfig::default();
        assert_eq!(filter_directive(&cfg, 0), "info");
        assert_eq!(filter_directive(&cfg, 2), "debug");
        assert_eq!(filter_directive(&cfg, 5), "trace");
    }

    #[test]
    fn builds_plain_and_json_subscribers() {
        for json in [false, true] {
            let cfg = LoggingConfig {
                level: "debug".to_owned(),
                json,
            };
            tracing::subscriber::with_default(subscriber(&cfg, 0), || {
                tracing::info!(json, "subscriber installed");
            });
        }
    }
}
