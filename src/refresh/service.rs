use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::constants::time::DEFAULT_RETRY_DELAY_SECS;
use crate::database::{PersistenceError, Repository};
use crate::datafeed::{FeedNormalizer, FeedParser, FetchError, NormalizeError, ParseError, RateSource};
use crate::metrics::{RefreshMetrics, RefreshStage};
use crate::rates::{CalculationError, RatesCache, RatesView, UpdateDatetime};
use crate::schedule::{Clock, SchedulingError, UpdateScheduler};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Failed to check data staleness: {0}")]
    Schedule(#[from] SchedulingError),

    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to normalize feed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Failed to parse feed: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to store snapshot: {0}")]
    Persist(#[from] PersistenceError),

    #[error("Failed to load latest snapshot: {0}")]
    Load(#[source] PersistenceError),

    #[error("Failed to calculate ratios: {0}")]
    Calculate(#[from] CalculationError),

    #[error("No snapshot has been stored yet")]
    NothingStored,

    #[error("Refresh cancelled by shutdown")]
    Cancelled,
}

impl RefreshError {
    /// Pipeline stage the failure belongs to
    pub fn stage(&self) -> RefreshStage {
        match self {
            RefreshError::Schedule(_) => RefreshStage::Schedule,
            RefreshError::Fetch(_) => RefreshStage::Fetch,
            RefreshError::Normalize(_) => RefreshStage::Normalize,
            RefreshError::Parse(_) => RefreshStage::Parse,
            RefreshError::Persist(_) => RefreshStage::Persist,
            RefreshError::Load(_) | RefreshError::NothingStored | RefreshError::Cancelled => RefreshStage::Load,
            RefreshError::Calculate(_) => RefreshStage::Calculate,
        }
    }
}

/// Result of a successful refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    /// Whether a new snapshot was fetched and stored during the cycle
    pub refreshed: bool,
    /// Update the published view belongs to
    pub update: UpdateDatetime,
    pub currencies: usize,
}

/// Keeps the rates cache in step with the upstream feed.
///
/// One cycle checks staleness, fetches and stores a new snapshot when needed,
/// then reloads the latest stored snapshot and publishes it with its ratios.
/// Failed cycles are logged and retried; nothing here terminates the process.
pub struct RefreshService {
    source: Arc<dyn RateSource>,
    normalizer: FeedNormalizer,
    parser: FeedParser,
    repository: Arc<dyn Repository>,
    cache: Arc<RatesCache>,
    scheduler: UpdateScheduler,
    clock: Arc<dyn Clock>,
    metrics: RefreshMetrics,
    retry_delay: Duration,
}

impl RefreshService {
    pub fn new(
        source: Arc<dyn RateSource>,
        repository: Arc<dyn Repository>,
        cache: Arc<RatesCache>,
        scheduler: UpdateScheduler,
        clock: Arc<dyn Clock>,
        metrics: RefreshMetrics,
    ) -> Self {
        Self {
            source,
            normalizer: FeedNormalizer::default(),
            parser: FeedParser::default(),
            repository,
            cache,
            scheduler,
            clock,
            metrics,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }

    pub fn with_normalizer(mut self, normalizer: FeedNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_parser(mut self, parser: FeedParser) -> Self {
        self.parser = parser;
        self
    }

    /// Upper bound on the wait after a failed cycle
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn cache(&self) -> &Arc<RatesCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &RefreshMetrics {
        &self.metrics
    }

    /// Runs cycles until `shutdown` turns true or its sender goes away
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting refresh loop, daily cutover at {}", self.scheduler.cutover());

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.run_cycle_until(&shutdown).await {
                Ok(_) => self.scheduler.next_due(),
                Err(RefreshError::Cancelled) => break,
                Err(_) => self.scheduler.next_due().min(self.retry_delay),
            };

            info!("Next update will occur after {:?}", delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown channel closed, stopping refresh loop");
                        break;
                    }
                }
            }
        }

        info!("Refresh loop stopped");
    }

    /// Runs a single cycle with no cancellation
    pub async fn run_cycle(&self) -> Result<RefreshOutcome, RefreshError> {
        let (_tx, rx) = watch::channel(false);
        self.run_cycle_until(&rx).await
    }

    /// Runs a single cycle, giving up between stages once `shutdown` is true
    pub async fn run_cycle_until(&self, shutdown: &watch::Receiver<bool>) -> Result<RefreshOutcome, RefreshError> {
        self.metrics.record_cycle();

        match self.cycle(shutdown).await {
            Ok(outcome) => Ok(outcome),
            Err(RefreshError::Cancelled) => {
                info!("Refresh cycle cancelled");
                Err(RefreshError::Cancelled)
            }
            Err(e) => {
                error!("Refresh cycle failed at {} stage: {}", e.stage(), e);
                self.metrics.record_failure(e.stage());
                Err(e)
            }
        }
    }

    async fn cycle(&self, shutdown: &watch::Receiver<bool>) -> Result<RefreshOutcome, RefreshError> {
        ensure_running(shutdown)?;

        info!("Checking latest update datetime");
        let latest = self
            .repository
            .latest_update_datetime()
            .await
            .map_err(RefreshError::Load)?;

        let refreshed = self.scheduler.is_stale(latest.as_ref())?;

        let latest = if refreshed {
            info!("Data is outdated, refreshing from {}", self.source.origin());
            self.fetch_and_store(shutdown).await?;
            info!("Data is now up to date");

            ensure_running(shutdown)?;
            self.repository
                .latest_update_datetime()
                .await
                .map_err(RefreshError::Load)?
        } else {
            debug!("Stored data is fresh, skipping fetch");
            latest
        };

        let latest = latest.ok_or(RefreshError::NothingStored)?;

        ensure_running(shutdown)?;
        let snapshot = self
            .repository
            .latest_currencies(latest.id)
            .await
            .map_err(RefreshError::Load)?;

        let view = RatesView::build(latest.clone(), snapshot)?;
        let currencies = view.calculated().len();

        self.cache.publish(view).await;
        self.metrics
            .record_published(currencies, self.clock.now().timestamp());

        Ok(RefreshOutcome {
            refreshed,
            update: latest,
            currencies,
        })
    }

    async fn fetch_and_store(&self, shutdown: &watch::Receiver<bool>) -> Result<(), RefreshError> {
        ensure_running(shutdown)?;
        let raw = self.source.fetch().await?;

        ensure_running(shutdown)?;
        let normalized = self.normalizer.normalize(raw)?;

        ensure_running(shutdown)?;
        let snapshot = self.parser.parse(&normalized)?;

        ensure_running(shutdown)?;
        let timestamp = self.clock.now().to_rfc3339();
        let update = self.repository.insert_snapshot(&timestamp, &snapshot).await?;

        self.metrics.record_snapshot_persisted();
        debug!(
            "Stored {} currencies as update #{} at {}",
            snapshot.len(),
            update.id,
            update.update_datetime
        );

        Ok(())
    }
}

fn ensure_running(shutdown: &watch::Receiver<bool>) -> Result<(), RefreshError> {
    if *shutdown.borrow() {
        return Err(RefreshError::Cancelled);
    }
    Ok(())
}
