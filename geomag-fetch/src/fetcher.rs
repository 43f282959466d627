//! Resource fetchers
//!
//! A [`Fetcher`] turns one candidate URI into raw bytes. It knows nothing
//! about compression or IAGA2002; the orchestrator handles both.

use async_trait::async_trait;
use geomag_common::config::HttpConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

const FILE_SCHEME: &str = "file://";

/// Fetches the raw body behind a URI
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) fetcher
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        debug!(uri = %uri, "HTTP GET");

        let response = self
            .http_client
            .get(uri)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(uri.to_string()));
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Local filesystem fetcher for `file://` URIs and plain paths
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl FileFetcher {
    fn path_for(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri))
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        let path = Self::path_for(uri);
        debug!(path = %path.display(), "Reading local file");

        match tokio::fs::read(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(uri.to_string()))
            }
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

/// Fetcher chosen from the scheme of the source root
pub enum AnyFetcher {
    Http(HttpFetcher),
    File(FileFetcher),
}

impl AnyFetcher {
    /// HTTP for `http://` / `https://` roots, local files otherwise
    pub fn for_source_root(source_root: &str, config: &HttpConfig) -> Result<Self, FetchError> {
        let lower = source_root.trim().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(AnyFetcher::Http(HttpFetcher::new(config)?))
        } else {
            Ok(AnyFetcher::File(FileFetcher))
        }
    }
}

#[async_trait]
impl Fetcher for AnyFetcher {
    fn name(&self) -> &'static str {
        match self {
            AnyFetcher::Http(f) => f.name(),
            AnyFetcher::File(f) => f.name(),
        }
    }

    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        match self {
            AnyFetcher::Http(f) => f.fetch(uri).await,
            AnyFetcher::File(f) => f.fetch(uri).await,
        }
    }
}
