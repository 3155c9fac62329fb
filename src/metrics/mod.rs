pub mod refresh_metrics;

pub use refresh_metrics::{RefreshMetrics, RefreshStage};
