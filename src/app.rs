//! Application wiring: builds every component once, leaves first, and runs
//! the refresh loop next to the HTTP server until shutdown.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::models::{AppConfig, SourceConfig};
use crate::config::parser::{require_database_password, ConfigError};
use crate::database::{establish_connection, run_migrations, DatabasePool, PgRepository, Repository};
use crate::datafeed::{FeedNormalizer, FeedParser, FileSource, HttpProtocol, HttpSource, RateSource};
use crate::error::RateKeeperError;
use crate::metrics::RefreshMetrics;
use crate::rates::RatesCache;
use crate::refresh::RefreshService;
use crate::schedule::{Clock, SystemClock, UpdateScheduler};
use crate::server::HttpServer;

/// The assembled service
pub struct App {
    refresh: Arc<RefreshService>,
    server: HttpServer,
    pool: Option<DatabasePool>,
    shutdown_grace: Duration,
}

impl App {
    /// Builds the production graph: configured source, PostgreSQL store,
    /// system clock
    pub async fn build(config: &AppConfig) -> Result<Self, RateKeeperError> {
        require_database_password(config)?;

        let source = build_source(&config.source)?;

        let pool = establish_connection(&config.database).await?;
        if config.database.run_migrations {
            run_migrations(&pool).await?;
        }
        let repository: Arc<dyn Repository> = Arc::new(PgRepository::new(pool.clone()));
        repository.health_check().await?;

        let mut app = Self::assemble(config, source, repository, Arc::new(SystemClock)).await?;
        app.pool = Some(pool);

        Ok(app)
    }

    /// Wires the cache, refresh loop and HTTP server around the given
    /// source, store and clock
    pub async fn assemble(
        config: &AppConfig,
        source: Arc<dyn RateSource>,
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateKeeperError> {
        let cache = Arc::new(RatesCache::new());
        let metrics = RefreshMetrics::new()?;
        let scheduler = UpdateScheduler::new(&config.schedule.cutover_time, clock.clone())?;

        let refresh = RefreshService::new(source, repository, cache.clone(), scheduler, clock, metrics.clone())
            .with_normalizer(FeedNormalizer::new(config.parsing.normalize_strategy()))
            .with_parser(FeedParser::new(
                config.parsing.parse_strategy(),
                config.parsing.initial_capacity,
            ))
            .with_retry_delay(config.refresh.retry_delay());

        let addr = config
            .server
            .socket_addr()
            .ok_or_else(|| ConfigError::Other(format!("invalid listen address {}", config.server.listen_ip)))?;
        let server = HttpServer::bind(addr, cache, metrics).await?;

        Ok(Self {
            refresh: Arc::new(refresh),
            server,
            pool: None,
            shutdown_grace: config.server.shutdown_grace(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RateKeeperError> {
        Ok(self.server.local_addr()?)
    }

    /// Runs until `shutdown` turns true, then drains HTTP connections,
    /// stops the refresh loop and closes the database pool
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), RateKeeperError> {
        let refresh = self.refresh.clone();
        let refresh_shutdown = shutdown.clone();
        let mut refresh_task: JoinHandle<()> = tokio::spawn(async move { refresh.run(refresh_shutdown).await });

        self.server.serve(shutdown, self.shutdown_grace).await?;

        match tokio::time::timeout(self.shutdown_grace, &mut refresh_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Refresh loop ended abnormally: {}", e),
            Err(_) => {
                warn!("Refresh loop did not stop within {:?}, aborting", self.shutdown_grace);
                refresh_task.abort();
            }
        }

        if let Some(pool) = self.pool {
            info!("Closing database connections");
            pool.close().await;
        }

        info!("Shutdown complete");

        Ok(())
    }
}

/// Picks the file or HTTP source according to configuration
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn RateSource>, RateKeeperError> {
    if config.read_from_file {
        info!("Reading currencies from file {}", config.file.display());
        return Ok(Arc::new(FileSource::new(&config.file)));
    }

    info!("Reading currencies from {}", config.url);
    Ok(Arc::new(http_source(config)?))
}

fn http_source(config: &SourceConfig) -> Result<HttpSource, RateKeeperError> {
    let protocol: HttpProtocol = config.http_protocol.parse()?;

    Ok(HttpSource::new(
        &config.url,
        protocol,
        &config.user_agent,
        config.fetch_timeout(),
    )?)
}

/// Downloads the feed once and overwrites the configured source file with it
pub async fn save(config: &SourceConfig) -> Result<PathBuf> {
    let source = http_source(config).context("Failed to create HTTP source")?;

    let data = source
        .fetch()
        .await
        .with_context(|| format!("Failed to download feed from {}", config.url))?;

    if let Some(parent) = config.file.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    tokio::fs::write(&config.file, &data)
        .await
        .with_context(|| format!("Failed to write feed to {}", config.file.display()))?;

    info!("Saved {} bytes of feed data to {}", data.len(), config.file.display());

    Ok(config.file.clone())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
