//! YANG catalog HTTP client
//!
//! The catalog endpoint is slow and occasionally flaky; transient failures
//! (429 and 5xx, plus transport errors) are retried up to 10 times with
//! exponential backoff before surfacing an error. The returned document is
//! treated as an opaque JSON blob for the core to deserialize.

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ClientError;

pub const DEFAULT_CATALOG_URL: &str = "https://yangcatalog.org/api";

const MAX_ATTEMPTS: u32 = 10;
const BACKOFF_BASE_SECS: u64 = 5;
const BACKOFF_CAP_SECS: u64 = 300;

/// Client for the public YANG module catalog service
pub struct YangCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl YangCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full catalog snapshot: every module with its metadata.
    pub async fn fetch_full_catalog(&self) -> Result<Value, ClientError> {
        let url = format!("{}/search/catalog", self.base_url);
        info!(url = %url, "Fetching full catalog snapshot");
        let document = self.get_with_retry(&url).await?;
        info!(url = %url, "Catalog snapshot fetched");
        Ok(document)
    }

    /// Fetch metadata for all modules without vendor implementation data.
    pub async fn fetch_all_modules(&self) -> Result<Value, ClientError> {
        let url = format!("{}/search/modules", self.base_url);
        self.get_with_retry(&url).await
    }

    async fn get_with_retry(&self, url: &str) -> Result<Value, ClientError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .client
                .get(url)
                .header("Accept", "application/json")
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json().await?);
                }
                Ok(response) if is_retryable(response.status()) => {
                    warn!(
                        url = %url,
                        status = %response.status(),
                        attempt,
                        "Catalog request failed, will retry"
                    );
                }
                Ok(response) => {
                    return Err(ClientError::Status {
                        status: response.status(),
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    warn!(url = %url, error = %e, attempt, "Catalog request failed, will retry");
                }
            }
            if attempt < MAX_ATTEMPTS {
                let delay = backoff_delay(attempt);
                debug!(url = %url, delay_secs = delay.as_secs(), "Backing off");
                tokio::time::sleep(delay).await;
            }
        }
        Err(ClientError::RetriesExhausted {
            url: url.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff: 5s, 10s, 20s, ... capped at 5 minutes.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = BACKOFF_BASE_SECS
        .saturating_mul(1u64 << (attempt - 1).min(16))
        .min(BACKOFF_CAP_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(5));
        assert_eq!(backoff_delay(2), Duration::from_secs(10));
        assert_eq!(backoff_delay(3), Duration::from_secs(20));
        assert_eq!(backoff_delay(10), Duration::from_secs(300));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = YangCatalogClient::new("https://yangcatalog.org/api/").unwrap();
        assert_eq!(client.base_url, "https://yangcatalog.org/api");
    }
}
