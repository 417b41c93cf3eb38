//! Perp maker quoting engine - entry point.
//!
//! Loads layered configuration, initializes logging and metrics, and
//! hands control to [`maker_bot::Application`]. `--selftest` runs the
//! offline suite instead and exits.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Order-book-imbalance maker for perp markets
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Deployment environment tag carried in startup logs
    #[arg(long, default_value = "dev")]
    env: String,

    /// Core configuration file (can also be set via MAKER_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Strategy parameter overlay, merged when the file exists
    #[arg(short, long, default_value = "config/params.toml")]
    params: String,

    /// Override one config key, repeatable: --override spread.base=10
    #[arg(long = "override", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Metrics port, takes precedence over the config file
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Log filter, takes precedence over the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Disable the metrics and health HTTP server
    #[arg(long)]
    no_metrics: bool,

    /// Run the offline self-test suite and exit
    #[arg(long)]
    selftest: bool,

    /// Recording mock gateway instead of live submission
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.selftest {
        maker_telemetry::init_logging(args.log_level.as_deref(), "info")?;
        maker_bot::selftest::run().await?;
        info!("Self-test passed, no network required");
        return Ok(());
    }

    // Config path: CLI arg > MAKER_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("MAKER_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let mut config =
        maker_bot::AppConfig::load(&config_path, Some(&args.params), &args.overrides)?;

    maker_telemetry::init_logging(args.log_level.as_deref(), &config.telemetry.log_level)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %args.env,
        config_path = %config_path,
        symbol = %config.symbol,
        dry_run = args.dry_run,
        "Starting maker bot"
    );

    config.validate()?;
    if let Some(port) = args.metrics_port {
        config.telemetry.metrics_port = port;
    }

    let app = maker_bot::Application::new(config, args.dry_run, args.no_metrics)?;
    app.run().await?;

    Ok(())
}
