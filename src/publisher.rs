//! Signed content fan-out
//!
//! Publishing snapshots the registry once, then delivers the payload to
//! each subscriber on its own task. Deliveries are independent and
//! fire-and-forget: each is signed with that subscriber's secret,
//! posted once, logged, and never retried. The reported count is the
//! snapshot size, not the number of successful deliveries; subscribers
//! admitted after the snapshot do not receive the publication.
//!
//! Task concurrency is bounded by a semaphore sized from configuration
//! rather than spawning an unbounded connection per subscriber.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::collaborator::CollaboratorClient;
use crate::registry::{Subscriber, SubscriberRegistry};
use crate::signing;
use crate::types::{HeraldError, Result};

/// Configuration for the publisher
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Maximum number of in-flight delivery tasks
    pub fanout_limit: usize,
    /// Timeout for each outbound delivery request
    pub request_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            fanout_limit: 32,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Concurrent signed-delivery publisher
pub struct Publisher {
    registry: Arc<SubscriberRegistry>,
    collaborator: Arc<CollaboratorClient>,
    http: reqwest::Client,
    fanout: Arc<Semaphore>,
}

impl Publisher {
    /// Create a publisher over the given registry
    pub fn new(
        config: PublisherConfig,
        registry: Arc<SubscriberRegistry>,
        collaborator: Arc<CollaboratorClient>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| HeraldError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            registry,
            collaborator,
            http,
            fanout: Arc::new(Semaphore::new(config.fanout_limit)),
        })
    }

    /// Fan out the content payload to every verified subscriber
    ///
    /// Returns the snapshot count immediately; deliveries may still be
    /// in flight or have failed when the count is reported.
    pub async fn publish(&self) -> Result<usize> {
        let payload = content_payload()?;
        let snapshot = self.registry.snapshot();

        for sub in snapshot.iter().cloned() {
            let http = self.http.clone();
            let payload = payload.clone();
            let fanout = Arc::clone(&self.fanout);
            let collaborator = Arc::clone(&self.collaborator);

            tokio::spawn(async move {
                let Ok(_permit) = fanout.acquire_owned().await else {
                    return;
                };
                deliver(&http, &sub, &payload).await;
                collaborator.fetch_logs().await;
            });
        }

        Ok(snapshot.len())
    }
}

/// Serialize the fixed "new content available" payload
pub fn content_payload() -> Result<Bytes> {
    let data = serde_json::json!({
        "message": "New content available",
    });
    let bytes = serde_json::to_vec(&data)?;
    Ok(Bytes::from(bytes))
}

/// Deliver one signed payload to one subscriber
async fn deliver(http: &reqwest::Client, sub: &Subscriber, payload: &Bytes) {
    let signature = signing::signature_header(&sub.secret, payload);

    let result = http
        .post(&sub.callback_url)
        .header("Content-Type", "application/json")
        .header("X-Hub-Signature", signature)
        .body(payload.clone())
        .send()
        .await;

    match result {
        Ok(response) => {
            info!(
                callback = %sub.callback_url,
                status = %response.status(),
                "Signed content sent to subscriber"
            );
        }
        Err(e) => {
            warn!(
                callback = %sub.callback_url,
                error = %e,
                "Failed to send signed content to subscriber"
            );
        }
    }
}
