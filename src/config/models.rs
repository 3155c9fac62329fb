use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::constants::{database, feed, network, time};
use crate::datafeed::{HttpProtocol, NormalizeStrategy, ParseStrategy};
use crate::schedule::parse_cutover;

/// The main configuration structure for the rate keeper
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate]
    pub logging: LoggingConfig,

    #[validate]
    pub source: SourceConfig,

    #[validate]
    pub parsing: ParsingConfig,

    #[validate]
    pub schedule: ScheduleConfig,

    #[validate]
    pub refresh: RefreshConfig,

    #[validate]
    pub database: DatabaseConfig,

    #[validate]
    pub server: ServerConfig,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log at DEBUG instead of INFO
    pub debug: bool,
}

/// Where the daily feed comes from
#[derive(Debug, Deserialize, Validate)]
#[serde(default)]
pub struct SourceConfig {
    /// Read the feed from `file` instead of downloading it
    pub read_from_file: bool,

    #[validate(custom = "validate_source_url")]
    pub url: String,

    /// Feed file read in file mode and written by `--save`
    pub file: PathBuf,

    #[validate(custom = "validate_http_protocol")]
    pub http_protocol: String,

    pub user_agent: String,

    #[validate(range(min = 1))]
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            read_from_file: false,
            url: feed::DEFAULT_SOURCE_URL.to_string(),
            file: PathBuf::from(feed::DEFAULT_SOURCE_FILE),
            http_protocol: feed::DEFAULT_HTTP_PROTOCOL.to_string(),
            user_agent: feed::DEFAULT_USER_AGENT.to_string(),
            fetch_timeout_secs: network::HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SourceConfig {
    pub fn protocol(&self) -> Option<HttpProtocol> {
        HttpProtocol::from_str(&self.http_protocol).ok()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default)]
pub struct ParsingConfig {
    /// Walk the event stream instead of decoding the whole document
    pub streaming: bool,

    #[validate(range(min = 1))]
    pub initial_capacity: usize,

    /// `numeric_fields` or `positional`
    #[validate(custom = "validate_normalizer")]
    pub normalizer: String,

    /// Untouched prefix length for the positional normalizer
    pub decimal_fixup_offset: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            initial_capacity: feed::DEFAULT_INITIAL_CAPACITY,
            normalizer: NormalizeStrategy::NumericFields.to_string(),
            decimal_fixup_offset: feed::DEFAULT_DECIMAL_FIXUP_OFFSET,
        }
    }
}

impl ParsingConfig {
    pub fn parse_strategy(&self) -> ParseStrategy {
        if self.streaming {
            ParseStrategy::Streaming
        } else {
            ParseStrategy::Document
        }
    }

    pub fn normalize_strategy(&self) -> NormalizeStrategy {
        match NormalizeStrategy::from_str(&self.normalizer) {
            Ok(NormalizeStrategy::Positional { .. }) => NormalizeStrategy::Positional {
                offset: self.decimal_fixup_offset,
            },
            Ok(strategy) => strategy,
            Err(_) => NormalizeStrategy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Daily time of day (`HH:MM:SS`) after which a new feed is expected
    #[validate(custom = "validate_cutover_time")]
    pub cutover_time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cutover_time: time::DEFAULT_CUTOVER_TIME.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default)]
pub struct RefreshConfig {
    /// Longest wait before retrying after a failed cycle
    #[validate(range(min = 1))]
    pub retry_delay_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: time::DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl RefreshConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(custom = "validate_driver")]
    pub driver: String,

    pub hostname: String,

    pub port: u16,

    pub username: String,

    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,

    pub database: String,

    #[validate(custom = "validate_sslmode")]
    pub sslmode: String,

    #[validate(range(min = 1))]
    pub max_connections: u32,

    /// Apply bundled migrations at startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: database::DEFAULT_DRIVER.to_string(),
            hostname: database::DEFAULT_HOSTNAME.to_string(),
            port: database::DEFAULT_PORT,
            username: database::DEFAULT_USERNAME.to_string(),
            password: SecretString::from(String::new()),
            database: database::DEFAULT_DATABASE.to_string(),
            sslmode: database::DEFAULT_SSLMODE.to_string(),
            max_connections: database::MAX_POOL_SIZE,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(custom = "validate_listen_ip")]
    pub listen_ip: String,

    pub listen_port: u16,

    /// Time in-flight requests get to finish on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_ip: network::DEFAULT_LISTEN_IP.to_string(),
            listen_port: network::DEFAULT_LISTEN_PORT,
            shutdown_grace_secs: network::SHUTDOWN_GRACE_SECS,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let ip = IpAddr::from_str(self.listen_ip.trim()).ok()?;
        Some(SocketAddr::new(ip, self.listen_port))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(SecretString::from(value.unwrap_or_default()))
}

fn validate_source_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("invalid_source_url")),
    }
}

fn validate_http_protocol(value: &str) -> Result<(), ValidationError> {
    HttpProtocol::from_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("unsupported_http_protocol"))
}

fn validate_normalizer(value: &str) -> Result<(), ValidationError> {
    NormalizeStrategy::from_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_normalizer_strategy"))
}

fn validate_cutover_time(value: &str) -> Result<(), ValidationError> {
    parse_cutover(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_cutover_time"))
}

fn validate_driver(value: &str) -> Result<(), ValidationError> {
    if value == database::DEFAULT_DRIVER {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_database_driver"))
    }
}

fn validate_sslmode(value: &str) -> Result<(), ValidationError> {
    match value {
        "disable" | "allow" | "prefer" | "require" | "verify-ca" | "verify-full" => Ok(()),
        _ => Err(ValidationError::new("invalid_sslmode")),
    }
}

fn validate_listen_ip(value: &str) -> Result<(), ValidationError> {
    IpAddr::from_str(value.trim())
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_listen_ip"))
}
