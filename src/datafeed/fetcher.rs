use async_trait::async_trait;
use reqwest::{header, Client, Version};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error};

/// Errors that can occur when fetching the raw feed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error with status code: {0}")]
    HttpError(u16),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to read response body: {0}")]
    BodyError(String),

    #[error("Failed to read feed file '{path}': {source}")]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    ClientError(String),

    #[error("Unsupported HTTP protocol label: {0}")]
    UnsupportedProtocol(String),
}

/// Anything that can produce the raw bytes of the daily feed
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Retrieves the complete feed payload. Never retries.
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;

    /// Human-readable origin of the feed, used in logs
    fn origin(&self) -> String;
}

/// Wire protocol label sent with the upstream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpProtocol {
    Http10,
    Http11,
    Http2,
}

impl HttpProtocol {
    pub fn version(self) -> Version {
        match self {
            HttpProtocol::Http10 => Version::HTTP_10,
            HttpProtocol::Http11 => Version::HTTP_11,
            HttpProtocol::Http2 => Version::HTTP_2,
        }
    }
}

impl FromStr for HttpProtocol {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HTTP/1.0" => Ok(HttpProtocol::Http10),
            "HTTP/1.1" => Ok(HttpProtocol::Http11),
            "HTTP/2" | "HTTP/2.0" => Ok(HttpProtocol::Http2),
            _ => Err(FetchError::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for HttpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HttpProtocol::Http10 => "HTTP/1.0",
            HttpProtocol::Http11 => "HTTP/1.1",
            HttpProtocol::Http2 => "HTTP/2",
        };
        f.write_str(label)
    }
}

/// Reads the feed from a local file
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RateSource for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!("Reading feed from file: {}", self.path.display());

        tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::FileError {
                path: self.path.clone(),
                source,
            })
    }

    fn origin(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Downloads the feed with a single GET request
pub struct HttpSource {
    client: Client,
    url: String,
    protocol: HttpProtocol,
    user_agent: String,
}

impl HttpSource {
    /// Creates a source with a reusable HTTP client
    pub fn new(
        url: impl Into<String>,
        protocol: HttpProtocol,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            protocol,
            user_agent: user_agent.into(),
        })
    }
}

#[async_trait]
impl RateSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let started = Instant::now();

        debug!("Using {} protocol in request", self.protocol);
        debug!("Using user-agent header: {}", self.user_agent);

        let response = match self
            .client
            .get(&self.url)
            .version(self.protocol.version())
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!("Network error fetching from {}: {}", self.url, e);
                return Err(FetchError::NetworkError(e.to_string()));
            }
        };

        let status = response.status();

        if !status.is_success() {
            error!(
                "HTTP error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(FetchError::HttpError(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::BodyError(e.to_string()))?;

        debug!(
            "Getting http data time overall: {:?} ({} bytes)",
            started.elapsed(),
            body.len()
        );

        Ok(body.to_vec())
    }

    fn origin(&self) -> String {
        self.url.clone()
    }
}
