use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use tracing::debug;
use validator::Validate;

use super::models::AppConfig;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("No database password specified (set DB_PASSWORD)")]
    MissingDatabasePassword,

    #[error("Configuration error: {0}")]
    Other(String),
}

/// Loads the configuration from an optional YAML file, overridden by the
/// process environment, and validates it
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(config_path, |key| std::env::var(key).ok())
}

/// Like [`load_config`] with an explicit variable lookup
pub fn load_config_with<F>(config_path: Option<&Path>, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match config_path {
        Some(path) => read_config_file(path)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;

    config.validate()?;

    Ok(config)
}

fn read_config_file(config_path: &Path) -> Result<AppConfig, ConfigError> {
    debug!("Reading configuration from {}", config_path.display());

    let mut file = File::open(config_path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    // An empty file means all defaults
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    Ok(serde_yaml::from_str(&content)?)
}

/// Fails unless a database password has been configured
pub fn require_database_password(config: &AppConfig) -> Result<(), ConfigError> {
    if config.database.has_password() {
        Ok(())
    } else {
        Err(ConfigError::MissingDatabasePassword)
    }
}

/// Overrides configuration values with the deployment environment variables
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    env.set_bool("ENABLE_DEBUG_LOGS", &mut config.logging.debug)?;

    let source = &mut config.source;
    env.set_bool("READ_CURRENCIES_FROM_FILE", &mut source.read_from_file)?;
    env.set_string("CURRENCIES_SOURCE_URL", &mut source.url);
    if let Some(file) = env.get("CURRENCIES_SOURCE_FILE") {
        source.file = PathBuf::from(file);
    }
    env.set_string("HTTP_REQUEST_PROTOCOL", &mut source.http_protocol);
    env.set_string("FAKE_USER_AGENT_HEADER_VALUE", &mut source.user_agent);
    env.set_parsed("FETCH_TIMEOUT_SECS", &mut source.fetch_timeout_secs, "a number of seconds")?;

    let parsing = &mut config.parsing;
    env.set_bool("USE_MULTITHREADED_PARSING", &mut parsing.streaming)?;
    env.set_parsed("INITIAL_CURRENCIES_CAPACITY", &mut parsing.initial_capacity, "a positive integer")?;
    env.set_string("NORMALIZER_STRATEGY", &mut parsing.normalizer);
    env.set_parsed("DECIMAL_FIXUP_OFFSET", &mut parsing.decimal_fixup_offset, "a byte offset")?;

    env.set_string("TIME_WHEN_NEED_TO_UPDATE_CURRENCY", &mut config.schedule.cutover_time);
    env.set_parsed("REFRESH_RETRY_DELAY_SECS", &mut config.refresh.retry_delay_secs, "a number of seconds")?;

    let database = &mut config.database;
    env.set_string("DB_DRIVER", &mut database.driver);
    env.set_string("DB_HOSTNAME", &mut database.hostname);
    env.set_parsed("DB_PORT", &mut database.port, "a port number")?;
    env.set_string("DB_USERNAME", &mut database.username);
    if let Some(password) = env.get("DB_PASSWORD") {
        database.password = SecretString::from(password);
    }
    env.set_string("DB_DATABASE", &mut database.database);
    env.set_string("DB_SSLMODE", &mut database.sslmode);
    env.set_parsed("DB_MAX_CONNECTIONS", &mut database.max_connections, "a positive integer")?;
    env.set_bool("DB_RUN_MIGRATIONS", &mut database.run_migrations)?;

    let server = &mut config.server;
    env.set_string("HTTP_SERVER_LISTEN_IP", &mut server.listen_ip);
    env.set_parsed("HTTP_SERVER_LISTEN_PORT", &mut server.listen_port, "a port number")?;
    env.set_parsed("SHUTDOWN_GRACE_SECS", &mut server.shutdown_grace_secs, "a number of seconds")?;

    Ok(())
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn set_string(&self, key: &str, target: &mut String) {
        if let Some(value) = self.get(key) {
            *target = value;
        }
    }

    fn set_bool(&self, key: &'static str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = self.get(key) {
            *target = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                key,
                value,
                expected: "true or false",
            })?;
        }
        Ok(())
    }

    fn set_parsed<T: FromStr>(&self, key: &'static str, target: &mut T, expected: &'static str) -> Result<(), ConfigError> {
        if let Some(value) = self.get(key) {
            *target = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key,
                value: value.clone(),
                expected,
            })?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
