use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, ScanError};

/// Answers "can we reach the network right now" before a cloud call
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probes a URL; any HTTP response at all counts as reachable.
pub struct HttpConnectivity {
    client: reqwest::Client,
    probe_url: String,
}

impl HttpConnectivity {
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(probe_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::PROBE_TIMEOUT)
            .build()
            .map_err(|e| ScanError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            probe_url: probe_url.into(),
        })
    }
}

#[async_trait]
impl Connectivity for HttpConnectivity {
    async fn is_reachable(&self) -> bool {
        match self.client.head(&self.probe_url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "connectivity probe answered");
                true
            }
            Err(e) => {
                debug!("connectivity probe failed: {}", e);
                false
            }
        }
    }
}

/// Fixed answer, for offline mode and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

#[async_trait]
impl Connectivity for StaticConnectivity {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_connectivity() {
        assert!(StaticConnectivity(true).is_reachable().await);
        assert!(!StaticConnectivity(false).is_reachable().await);
    }

    #[tokio::test]
    async fn test_unroutable_probe_is_unreachable() {
        // Port 9 on localhost is discard; nothing listens there in CI
        let probe = HttpConnectivity::new("http://127.0.0.1:9/").expect("client should build");
        assert!(!probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_malformed_url_is_unreachable() {
        let probe = HttpConnectivity::new("not a url").unwrap();
        assert!(!probe.is_reachable().await);
    }
}
