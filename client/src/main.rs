//! quotesync command line entry point.

use clap::Parser;
use quotesync::cli::{Cli, Command};
use quotesync::status::Status;
use quotesync::{commands, watch, Config, HttpRemote, LocalStorage, SyncEngine};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotesync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", Status::error(e.to_string()));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    dotenvy::dotenv().ok();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base.trim_end_matches('/').to_string();
    }
    tracing::debug!(?config, "Configuration loaded");

    let remote = HttpRemote::new(&config.api_base, config.http_timeout)?;
    let storage = LocalStorage::new(&config.data_dir);
    let engine = SyncEngine::open(remote, storage, config.fetch_limit);

    match cli.command {
        Command::Watch { interval } => {
            let interval = interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(config.sync_interval);
            tracing::info!(url = %engine.remote().posts_url(), ?interval, "Watching");
            watch::run(Arc::new(engine), interval).await?;
        }
        command => {
            for line in commands::execute(&engine, command).await? {
                println!("{line}");
            }
        }
    }
    Ok(())
}
