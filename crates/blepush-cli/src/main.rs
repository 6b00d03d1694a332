//! blepush - push an image to a BLE peripheral

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use blepush_cli::{app::PushApp, cli::Cli, config::AppConfig, error::Result};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = load_configuration(&cli)?;
    config.apply_overrides(&cli);

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(0);
    }

    // clap only lets the address be absent together with --print-config
    let address = cli.address.as_deref().unwrap_or_default();
    let app = PushApp::new(address, config)?;

    let report = app.run().await?;
    if report.is_completed() {
        info!("Image delivered to {}", report.target);
    }
    Ok(report.exit_code())
}

/// Setup logging on stderr based on verbosity level; `RUST_LOG` takes precedence
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path.display());
        Ok(AppConfig::load_from_file(config_path)?)
    } else {
        info!("Using default configuration");
        Ok(AppConfig::default())
    }
}
