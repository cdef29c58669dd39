//! BlueChat CLI Application

use std::time::Duration;

use anyhow::Context;
use bluechat_cli::app::render_devices;
use bluechat_cli::demo::run_demo;
use bluechat_cli::{AppConfig, BluechatApp, Cli, Commands};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_configuration(&cli)?;
    setup_logging(cli.verbose || config.cli.verbose);

    debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
        Commands::Demo => {
            for line in run_demo(&config).await? {
                println!("{}", line);
            }
        }
        Commands::Chat => {
            info!("Starting chat as {:?}", config.ble.local_name);
            let mut app = BluechatApp::start_ble(config).await?;
            let result = app.chat().await;
            app.shutdown().await?;
            result?;
        }
        Commands::Send { message, timeout } => {
            let mut app = BluechatApp::start_ble(config).await?;
            let result = app.send_once(&message, Duration::from_secs(timeout)).await;
            app.shutdown().await?;
            let sent = result.context("message was not delivered")?;
            println!("sent: {}", sent.text());
        }
        Commands::Peers { duration } => {
            let mut app = BluechatApp::start_ble(config).await?;
            let devices = app.scan_for(Duration::from_secs(duration)).await;
            app.shutdown().await?;
            println!("{}", render_devices(&devices?));
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the verbose flag picks the level
fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_configuration(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(name) = &cli.name {
        config.ble.local_name = name.clone();
    }
    if cli.verbose {
        config.cli.verbose = true;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
