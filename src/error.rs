use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateKeeperError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::parser::ConfigError),

    #[error("Feed source error: {0}")]
    Fetch(#[from] crate::datafeed::FetchError),

    #[error("Database error: {0}")]
    Persistence(#[from] crate::database::PersistenceError),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] crate::schedule::SchedulingError),

    #[error("HTTP server error: {0}")]
    Server(#[from] crate::server::ServerError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
