// file: src/network/download.rs
// version: 1.0.0
// guid: 72b0414b-8cce-426b-b178-6034426fc446

//! Remote configuration fetching with a bounded retry policy

use crate::error::InstallError;
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts made before giving up on a remote source
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Only success and redirect-class statuses are accepted
pub fn is_accepted_status(status: u16) -> bool {
    (200..400).contains(&status)
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// HTTP fetcher for configuration documents
#[derive(Debug, Clone)]
pub struct ConfigFetcher {
    client: reqwest::Client,
    max_attempts: u32,
    base_delay: Duration,
}

impl ConfigFetcher {
    /// Create a fetcher with the default retry policy
    pub fn new() -> Self {
        Self::with_retry_policy(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }

    /// Create a fetcher with a custom attempt cap and base backoff
    pub fn with_retry_policy(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(5);
        (self.base_delay * factor).min(MAX_DELAY)
    }

    /// Fetch the body at `url`, retrying transport failures and 5xx/429
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("Fetching configuration from {}", url);

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan.bold}  {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Downloading {}", url));
        pb.enable_steady_tick(Duration::from_millis(80));

        let result = self.fetch_with_retry(url).await;
        pb.finish_and_clear();
        result
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_error = InstallError::network(format!("no attempt made for {}", url));

        for attempt in 1..=self.max_attempts {
            debug!("GET {} (attempt {}/{})", url, attempt, self.max_attempts);

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if is_accepted_status(status) {
                        let body = response.bytes().await?;
                        debug!("Fetched {} bytes from {}", body.len(), url);
                        return Ok(body.to_vec());
                    }

                    last_error = InstallError::network(format!(
                        "url response status code is invalid: {}",
                        status
                    ));
                    if !is_retryable_status(status) {
                        return Err(last_error);
                    }
                }
                Err(e) => {
                    last_error = InstallError::network(format!("request to {} failed: {}", url, e));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.backoff(attempt);
                warn!(
                    "Fetching {} failed ({}), retrying in {:?}",
                    url, last_error, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error)
    }
}

impl Default for ConfigFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve the given raw responses, one per accepted connection
    async fn serve(responses: Vec<&'static str>) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/llmos.yaml", addr), hits)
    }

    const OK: &str =
        "HTTP/1.1 200 OK\r\nContent-Length: 14\r\nConnection: close\r\n\r\nhostname: test";
    const NOT_FOUND: &str =
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const UNAVAILABLE: &str =
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

    #[test]
    fn test_accepted_status_range() {
        assert!(is_accepted_status(200));
        assert!(is_accepted_status(302));
        assert!(is_accepted_status(399));
        assert!(!is_accepted_status(199));
        assert!(!is_accepted_status(400));
        assert!(!is_accepted_status(500));
    }

    #[test]
    fn test_backoff_is_capped() {
        let fetcher = ConfigFetcher::with_retry_policy(5, Duration::from_secs(1));
        assert_eq!(fetcher.backoff(1), Duration::from_secs(1));
        assert_eq!(fetcher.backoff(2), Duration::from_secs(2));
        assert_eq!(fetcher.backoff(4), Duration::from_secs(8));
        assert_eq!(fetcher.backoff(10), MAX_DELAY);
    }

    #[test]
    fn test_default_policy_caps_attempts() {
        assert_eq!(ConfigFetcher::new().max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(
            ConfigFetcher::with_retry_policy(0, Duration::ZERO).max_attempts(),
            1
        );
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let (url, hits) = serve(vec![OK]).await;
        let fetcher = ConfigFetcher::with_retry_policy(3, Duration::ZERO);
        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, b"hostname: test");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_client_error_is_not_retried() {
        let (url, hits) = serve(vec![NOT_FOUND]).await;
        let fetcher = ConfigFetcher::with_retry_policy(3, Duration::ZERO);
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let (url, hits) = serve(vec![UNAVAILABLE, OK]).await;
        let fetcher = ConfigFetcher::with_retry_policy(3, Duration::ZERO);
        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, b"hostname: test");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_cap() {
        let (url, hits) = serve(vec![UNAVAILABLE, UNAVAILABLE]).await;
        let fetcher = ConfigFetcher::with_retry_policy(2, Duration::ZERO);
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, InstallError::NetworkError(_)));
        assert!(err.to_string().contains("503"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
