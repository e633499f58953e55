//! Remote icon fetching.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Boxed future used by object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// User-Agent sent with icon requests. Some CDNs reject requests without one.
const DEFAULT_USER_AGENT: &str = concat!("mapoverlay/", env!("CARGO_PKG_VERSION"));

/// Remote fetch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Connection, timeout or body read failure
    #[error("Request failed: {0}")]
    Transport(String),

    /// HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Fetches icon bytes from a URL.
///
/// Object safe so the icon cache can hold any implementation behind an
/// `Arc<dyn IconFetcher>`, including test doubles.
pub trait IconFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// HTTP fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl IconFetcher for ReqwestFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(|e| {
                warn!(
                    url = url,
                    error = %e,
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    "Icon request failed"
                );
                FetchError::Transport(e.to_string())
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            debug!(url = url, bytes = bytes.len(), "Icon fetched");
            Ok(bytes.to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(ReqwestFetcher::new(Duration::from_secs(4)).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::Status {
            url: "https://x/a.png".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://x/a.png");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let fetcher = ReqwestFetcher::new(Duration::from_millis(500)).unwrap();
        // Port 9 on localhost refuses connections
        let result = fetcher.fetch("http://127.0.0.1:9/icon.png").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
