use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, Level};

use rate_keeper::app::{self, App};
use rate_keeper::cli::Cli;
use rate_keeper::config::{self, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables win over it
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config);

    if let Some(path) = &cli.config {
        info!("Using configuration file: {:?}", path);
    }

    if cli.save {
        return match app::save(&config.source).await {
            Ok(path) => {
                info!("Currency data saved to {}", path.display());
                Ok(())
            }
            Err(e) => {
                error!("Failed to save currency data: {:#}", e);
                Err(e)
            }
        };
    }

    info!("Rate keeper starting up...");

    let app = App::build(&config).await.context("Failed to start rate keeper")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        app::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    app.run(shutdown_rx).await.context("Rate keeper stopped with an error")?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let level = if config.logging.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();
}
