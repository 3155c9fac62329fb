pub mod service;

pub use service::{RefreshError, RefreshOutcome, RefreshService};
