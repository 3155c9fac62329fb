#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    use crate::config::parser::{load_config_with, require_database_password, ConfigError};
    use crate::datafeed::{HttpProtocol, NormalizeStrategy, ParseStrategy};

    // Helper function to create a temporary file with content
    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = load_config_with(None, env(&[])).expect("defaults must be valid");

        assert!(!config.logging.debug);
        assert!(!config.source.read_from_file);
        assert_eq!(config.source.url, "https://www.cbr.ru/scripts/XML_daily.asp");
        assert_eq!(config.source.file, PathBuf::from("currencies.xml"));
        assert_eq!(config.source.protocol(), Some(HttpProtocol::Http11));
        assert_eq!(config.source.user_agent, "Mozilla/5.0 (X11; Linux x86_64)");
        assert_eq!(config.parsing.parse_strategy(), ParseStrategy::Streaming);
        assert_eq!(config.parsing.initial_capacity, 50);
        assert_eq!(config.parsing.normalize_strategy(), NormalizeStrategy::NumericFields);
        assert_eq!(config.schedule.cutover_time, "13:30:00");
        assert_eq!(config.database.hostname, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.username, "postgres");
        assert_eq!(config.database.database, "currency_storage");
        assert_eq!(config.database.sslmode, "disable");
        assert!(config.database.run_migrations);
        assert_eq!(
            config.server.socket_addr(),
            Some("0.0.0.0:8080".parse::<SocketAddr>().unwrap())
        );
    }

    #[test]
    fn test_missing_password_is_rejected() {
        let config = load_config_with(None, env(&[])).unwrap();

        let result = require_database_password(&config);
        assert!(matches!(result, Err(ConfigError::MissingDatabasePassword)));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("No database password specified"));
    }

    #[test]
    fn test_environment_overrides() {
        let config = load_config_with(
            None,
            env(&[
                ("ENABLE_DEBUG_LOGS", "true"),
                ("READ_CURRENCIES_FROM_FILE", "1"),
                ("CURRENCIES_SOURCE_FILE", "/var/lib/rates/daily.xml"),
                ("HTTP_REQUEST_PROTOCOL", "HTTP/1.0"),
                ("USE_MULTITHREADED_PARSING", "false"),
                ("TIME_WHEN_NEED_TO_UPDATE_CURRENCY", "15:00:00"),
                ("INITIAL_CURRENCIES_CAPACITY", "64"),
                ("NORMALIZER_STRATEGY", "positional"),
                ("DECIMAL_FIXUP_OFFSET", "120"),
                ("DB_HOSTNAME", "db.internal"),
                ("DB_PORT", "6432"),
                ("DB_PASSWORD", "s3cret"),
                ("DB_SSLMODE", "require"),
                ("HTTP_SERVER_LISTEN_IP", "127.0.0.1"),
                ("HTTP_SERVER_LISTEN_PORT", "9090"),
            ]),
        )
        .unwrap();

        assert!(config.logging.debug);
        assert!(config.source.read_from_file);
        assert_eq!(config.source.file, PathBuf::from("/var/lib/rates/daily.xml"));
        assert_eq!(config.source.protocol(), Some(HttpProtocol::Http10));
        assert_eq!(config.parsing.parse_strategy(), ParseStrategy::Document);
        assert_eq!(config.parsing.initial_capacity, 64);
        assert_eq!(
            config.parsing.normalize_strategy(),
            NormalizeStrategy::Positional { offset: 120 }
        );
        assert_eq!(config.schedule.cutover_time, "15:00:00");
        assert_eq!(config.database.hostname, "db.internal");
        assert_eq!(config.database.port, 6432);
        assert_eq!(config.database.password.expose_secret(), "s3cret");
        assert_eq!(config.database.sslmode, "require");
        assert_eq!(
            config.server.socket_addr(),
            Some("127.0.0.1:9090".parse::<SocketAddr>().unwrap())
        );
        assert!(require_database_password(&config).is_ok());
    }

    #[test]
    fn test_yaml_file_with_env_precedence() {
        let config_yaml = r#"
        source:
          url: https://example.org/daily.xml
          user_agent: curl/8.0
        schedule:
          cutover_time: "12:00:00"
        database:
          hostname: yaml-host
          password: from-yaml
        "#;
        let temp_file = create_temp_file(config_yaml);

        let config = load_config_with(Some(temp_file.path()), env(&[("DB_HOSTNAME", "env-host")])).unwrap();

        assert_eq!(config.source.url, "https://example.org/daily.xml");
        assert_eq!(config.source.user_agent, "curl/8.0");
        assert_eq!(config.schedule.cutover_time, "12:00:00");
        assert_eq!(config.database.hostname, "env-host");
        assert_eq!(config.database.password.expose_secret(), "from-yaml");
        // Unset sections keep their defaults
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.parsing.initial_capacity, 50);
    }

    #[test]
    fn test_empty_yaml_file_means_defaults() {
        let temp_file = create_temp_file("");
        let config = load_config_with(Some(temp_file.path()), env(&[])).unwrap();

        assert_eq!(config.schedule.cutover_time, "13:30:00");
    }

    #[test]
    fn test_missing_file() {
        let result = load_config_with(Some(std::path::Path::new("/nonexistent/rate-keeper.yaml")), env(&[]));
        assert!(matches!(result, Err(ConfigError::FileError(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let temp_file = create_temp_file("source: [unclosed");
        let result = load_config_with(Some(temp_file.path()), env(&[]));

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let cases: &[(&str, &str)] = &[
            ("TIME_WHEN_NEED_TO_UPDATE_CURRENCY", "1:30 PM"),
            ("HTTP_REQUEST_PROTOCOL", "SPDY/3"),
            ("DB_DRIVER", "mysql"),
            ("DB_SSLMODE", "sometimes"),
            ("INITIAL_CURRENCIES_CAPACITY", "0"),
            ("NORMALIZER_STRATEGY", "regex"),
            ("CURRENCIES_SOURCE_URL", "not a url"),
            ("HTTP_SERVER_LISTEN_IP", "localhost"),
        ];

        for &(key, value) in cases {
            let result = load_config_with(None, env(&[(key, value)]));
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "{key}={value} should fail validation"
            );
        }
    }

    #[test]
    fn test_malformed_environment_values() {
        let cases: &[(&str, &str)] = &[
            ("ENABLE_DEBUG_LOGS", "maybe"),
            ("DB_PORT", "five"),
            ("HTTP_SERVER_LISTEN_PORT", "70000"),
            ("FETCH_TIMEOUT_SECS", "-1"),
        ];

        for &(key, value) in cases {
            let result = load_config_with(None, env(&[(key, value)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidEnv { .. })),
                "{key}={value} should be rejected"
            );
        }
    }
}
