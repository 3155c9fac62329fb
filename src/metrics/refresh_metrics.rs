use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::fmt;
use tracing::{debug, warn};

/// Refresh pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    Schedule,
    Fetch,
    Normalize,
    Parse,
    Persist,
    Load,
    Calculate,
}

impl RefreshStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshStage::Schedule => "schedule",
            RefreshStage::Fetch => "fetch",
            RefreshStage::Normalize => "normalize",
            RefreshStage::Parse => "parse",
            RefreshStage::Persist => "persist",
            RefreshStage::Load => "load",
            RefreshStage::Calculate => "calculate",
        }
    }
}

impl fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refresh loop metrics, registered on a registry owned by the application
#[derive(Clone)]
pub struct RefreshMetrics {
    registry: Registry,
    cycles: IntCounter,
    failures: IntCounterVec,
    snapshots_persisted: IntCounter,
    cached_currencies: IntGauge,
    last_refresh_timestamp: IntGauge,
}

impl RefreshMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cycles = IntCounter::new("refresh_cycles_total", "Total number of refresh cycles run")?;
        let failures = IntCounterVec::new(
            Opts::new("refresh_failures_total", "Total number of failed refresh cycles"),
            &["stage"],
        )?;
        let snapshots_persisted = IntCounter::new(
            "snapshots_persisted_total",
            "Total number of feed snapshots written to the store",
        )?;
        let cached_currencies = IntGauge::new(
            "cached_currencies",
            "Number of currencies in the published view",
        )?;
        let last_refresh_timestamp = IntGauge::new(
            "last_refresh_timestamp_seconds",
            "Unix timestamp of the last successful refresh cycle",
        )?;

        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(snapshots_persisted.clone()))?;
        registry.register(Box::new(cached_currencies.clone()))?;
        registry.register(Box::new(last_refresh_timestamp.clone()))?;

        Ok(Self {
            registry,
            cycles,
            failures,
            snapshots_persisted,
            cached_currencies,
            last_refresh_timestamp,
        })
    }

    pub fn record_cycle(&self) {
        self.cycles.inc();
    }

    pub fn record_failure(&self, stage: RefreshStage) {
        self.failures.with_label_values(&[stage.as_str()]).inc();
        debug!("Recorded refresh failure at {} stage", stage);
    }

    pub fn record_snapshot_persisted(&self) {
        self.snapshots_persisted.inc();
    }

    /// Records a successful publish of `currencies` entries at `timestamp`
    pub fn record_published(&self, currencies: usize, timestamp: i64) {
        self.cached_currencies.set(currencies as i64);
        self.last_refresh_timestamp.set(timestamp);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.get()
    }

    pub fn failures(&self, stage: RefreshStage) -> u64 {
        self.failures.with_label_values(&[stage.as_str()]).get()
    }

    pub fn snapshots_persisted(&self) -> u64 {
        self.snapshots_persisted.get()
    }

    pub fn cached_currencies(&self) -> i64 {
        self.cached_currencies.get()
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
            return String::new();
        }

        String::from_utf8_lossy(&buffer).into_owned()
    }
}
