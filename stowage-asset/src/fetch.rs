//! Outbound URI fetching.
//!
//! The resolver only needs a status, a declared length and a readable body,
//! so fetching sits behind [`UriFetcher`]. [`HttpFetcher`] is the reqwest
//! implementation; tests substitute their own.

use std::io;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{Client, Url};
use stowage_storage::BlobReader;
use thiserror::Error;
use tokio_util::io::StreamReader;

use crate::config::AssetConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to get {uri}: {reason}")]
    Transport { uri: String, reason: String },
}

/// Response to a GET.
pub struct FetchedBody {
    pub status: u16,
    /// Declared content length, `None` when the server did not send one.
    pub content_length: Option<u64>,
    pub body: BlobReader,
}

impl FetchedBody {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for FetchedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedBody")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Performs a GET and hands back the body as a stream.
#[async_trait]
pub trait UriFetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchedBody, FetchError>;
}

/// reqwest-backed [`UriFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &AssetConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one shared with other subsystems.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UriFetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<FetchedBody, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                uri: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let content_length = response.content_length();

        if !response.status().is_success() {
            return Ok(FetchedBody {
                status,
                content_length,
                body: Box::new(tokio::io::empty()),
            });
        }

        // Read lazily by the caller; a broken transfer surfaces as a read
        // error rather than an early EOF.
        let stream = response.bytes_stream().map_err(io::Error::other);
        Ok(FetchedBody {
            status,
            content_length,
            body: Box::new(StreamReader::new(Box::pin(stream))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_http_fetcher_builds_from_config() {
        let config = AssetConfig::new()
            .with_fetch_timeout(Duration::from_secs(5))
            .with_user_agent("stowage-test");
        assert!(HttpFetcher::new(&config).is_ok());
        assert!(HttpFetcher::new(&AssetConfig::default()).is_ok());
    }

    #[test]
    fn test_fetched_body_success_range() {
        let body = |status| FetchedBody {
            status,
            content_length: None,
            body: Box::new(tokio::io::empty()),
        };
        assert!(body(200).is_success());
        assert!(body(204).is_success());
        assert!(!body(199).is_success());
        assert!(!body(304).is_success());
        assert!(!body(404).is_success());
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let fetcher = HttpFetcher::new(&AssetConfig::default()).expect("client");
        // Port 1 on loopback refuses connections.
        let url = Url::parse("http://127.0.0.1:1/blob").expect("url");
        let err = fetcher.get(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
