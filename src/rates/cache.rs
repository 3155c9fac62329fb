use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::models::{CalculatedCurrency, Snapshot, UpdateDatetime};
use super::ratio::{calculate_all, CalculationError};

/// A snapshot together with the ratios derived from it.
///
/// Built only through [`RatesView::build`], so the ratio list always belongs
/// to the snapshot it travels with.
#[derive(Debug, Clone, PartialEq)]
pub struct RatesView {
    update_datetime: UpdateDatetime,
    snapshot: Snapshot,
    calculated: Vec<CalculatedCurrency>,
}

impl RatesView {
    /// Derives the ratios for `snapshot` and bundles them with it
    pub fn build(
        update_datetime: UpdateDatetime,
        snapshot: Snapshot,
    ) -> Result<Self, CalculationError> {
        let calculated = calculate_all(&snapshot)?;

        Ok(Self {
            update_datetime,
            snapshot,
            calculated,
        })
    }

    pub fn update_datetime(&self) -> &UpdateDatetime {
        &self.update_datetime
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn calculated(&self) -> &[CalculatedCurrency] {
        &self.calculated
    }
}

/// In-memory holder of the latest published rates view
#[derive(Default)]
pub struct RatesCache {
    view: RwLock<Option<Arc<RatesView>>>,
}

impl RatesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published view in a single write
    pub async fn publish(&self, view: RatesView) {
        let currencies = view.calculated.len();
        let update_id = view.update_datetime.id;

        let mut slot = self.view.write().await;
        *slot = Some(Arc::new(view));

        info!(
            "Published {} currencies from update #{}",
            currencies, update_id
        );
    }

    /// Returns the current view, or `None` before the first refresh
    pub async fn get(&self) -> Option<Arc<RatesView>> {
        let view = self.view.read().await.clone();

        if view.is_none() {
            debug!("Rates cache read before first publish");
        }

        view
    }

    pub async fn snapshot(&self) -> Option<Snapshot> {
        self.get().await.map(|view| view.snapshot.clone())
    }

    pub async fn calculated(&self) -> Option<Vec<CalculatedCurrency>> {
        self.get().await.map(|view| view.calculated.clone())
    }

    pub async fn is_populated(&self) -> bool {
        self.view.read().await.is_some()
    }
}
