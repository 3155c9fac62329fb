//! Keeps a daily currency exchange rate feed in PostgreSQL and serves the
//! derived ratios over HTTP.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod database;
pub mod datafeed;
pub mod error;
pub mod metrics;
pub mod rates;
pub mod refresh;
pub mod schedule;
pub mod server;

#[cfg(test)]
pub mod test_utils;

pub use error::RateKeeperError;
