//! Application-wide constants
//!
//! Default values and magic numbers used throughout the application, kept in
//! one place so they are easy to find and modify.

/// Feed-related constants
pub mod feed {
    /// Daily feed published by the Central Bank of Russia
    pub const DEFAULT_SOURCE_URL: &str = "https://www.cbr.ru/scripts/XML_daily.asp";

    /// Local copy of the feed used in file mode and written by `--save`
    pub const DEFAULT_SOURCE_FILE: &str = "currencies.xml";

    /// User-Agent sent upstream; the publisher rejects obvious bots
    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";

    pub const DEFAULT_HTTP_PROTOCOL: &str = "HTTP/1.1";

    /// Bytes at the start of the feed never touched by the positional fix-up
    pub const DEFAULT_DECIMAL_FIXUP_OFFSET: usize = 100;

    /// Elements whose text holds a decimal number
    pub const NUMERIC_ELEMENTS: &[&str] = &["Value", "VunitRate"];

    /// Element wrapping a single currency quote
    pub const CURRENCY_ELEMENT: &str = "Valute";

    /// Encoding assumed when the document declares none and has no BOM
    pub const FALLBACK_ENCODING: &str = "UTF-8";

    /// How many bytes of the document are searched for an encoding declaration
    pub const PROLOG_SNIFF_LEN: usize = 256;

    /// Expected number of currencies in a feed
    pub const DEFAULT_INITIAL_CAPACITY: usize = 50;
}

/// Time-related constants
pub mod time {
    /// Time of day after which a new feed is expected upstream
    pub const DEFAULT_CUTOVER_TIME: &str = "13:30:00";

    /// Format of the configured cutover time
    pub const CUTOVER_TIME_FORMAT: &str = "%H:%M:%S";

    /// Delay before retrying a failed refresh cycle (in seconds)
    pub const DEFAULT_RETRY_DELAY_SECS: u64 = 300;
}

/// Network-related constants
pub mod network {
    /// Default HTTP request timeout for the upstream feed (in seconds)
    pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

    pub const DEFAULT_LISTEN_IP: &str = "0.0.0.0";

    pub const DEFAULT_LISTEN_PORT: u16 = 8080;

    /// Time allowed for in-flight requests after a shutdown signal (in seconds)
    pub const SHUTDOWN_GRACE_SECS: u64 = 10;
}

/// Database-related constants
pub mod database {
    pub const DEFAULT_DRIVER: &str = "postgres";

    pub const DEFAULT_HOSTNAME: &str = "localhost";

    pub const DEFAULT_PORT: u16 = 5432;

    pub const DEFAULT_USERNAME: &str = "postgres";

    pub const DEFAULT_DATABASE: &str = "currency_storage";

    pub const DEFAULT_SSLMODE: &str = "disable";

    /// Connection pool maximum size
    pub const MAX_POOL_SIZE: u32 = 5;

    /// Connection acquire timeout (in seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Server-side limit on any single statement (in milliseconds)
    pub const STATEMENT_TIMEOUT_MS: u64 = 30_000;
}
