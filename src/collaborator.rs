//! Client for the external resubscription helper service
//!
//! The collaborator exposes `GET /resub` (triggers its own
//! resubscription logic) and `GET /log` (returns a plain-text log body
//! fetched after each delivery attempt for diagnostic echoing). All
//! calls are best-effort: failures are logged and dropped.

use std::time::Duration;
use tracing::{info, warn};

use crate::types::{HeraldError, Result};

/// HTTP client for the resubscription helper
pub struct CollaboratorClient {
    base_url: String,
    http: reqwest::Client,
}

impl CollaboratorClient {
    /// Create a client for the collaborator at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Trigger the collaborator's resubscription logic
    ///
    /// Success or failure is logged; nothing is surfaced to the caller
    /// beyond the Result.
    pub async fn trigger_resub(&self) -> Result<()> {
        let url = format!("{}/resub", self.base_url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Failed to initiate resubscription");
            HeraldError::Delivery(e.to_string())
        })?;

        if response.status().is_success() {
            info!("Resubscription initiated successfully");
            Ok(())
        } else {
            warn!(
                status = %response.status(),
                "Failed to initiate resubscription"
            );
            Err(HeraldError::Delivery(format!(
                "resubscription returned {}",
                response.status()
            )))
        }
    }

    /// Fetch the collaborator's log body and echo it to our own log
    pub async fn fetch_logs(&self) {
        let url = format!("{}/log", self.base_url);

        let response = match self.http.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch subscriber logs");
                return;
            }
        };

        match response.text().await {
            Ok(body) => {
                info!("Subscriber logs:\n{}", body);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to read subscriber logs body");
            }
        }
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
