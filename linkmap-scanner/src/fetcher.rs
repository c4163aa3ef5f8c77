//! Content transport used by the crawl workers.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("linkmap/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw bytes stored at a location.
///
/// The crawl engine makes no assumptions about caching, retries or
/// timeouts; an implementation may impose its own deadline.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// Fetches locations over HTTP(S) with a pooled `reqwest` client.
///
/// The body is returned whatever the response status; error pages still
/// contain links worth recording.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        debug!("Fetching {}", location);

        let response = self.client.get(location).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("{} responded with {}", location, status);
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// Serves content from an in-memory map of location to body.
///
/// Fetching a location that is not in the map fails, as a missing page
/// would. Useful for offline crawls and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    content: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, location: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(location, body);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.content.insert(location.into(), body.into());
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for StaticFetcher
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fetcher = Self::new();
        for (location, body) in iter {
            fetcher.insert(location, body);
        }
        fetcher
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        self.content
            .get(location)
            .cloned()
            .ok_or_else(|| ScanError::FetchError(format!("page does not exist: {}", location)))
    }
}
