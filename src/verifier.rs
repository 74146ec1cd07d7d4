//! Subscription verification
//!
//! Proves that a subscriber controls its claimed callback URL before
//! admitting it to the registry. The hub issues a GET to the callback
//! with a random `hub.challenge` token; the subscriber must respond
//! with a body exactly equal to the token. Any transport error or a
//! non-matching body drops the request silently: logged only, no
//! subscriber-visible error, no retry.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::registry::{Subscriber, SubscriberRegistry};
use crate::signing;
use crate::types::{HeraldError, Result};

/// Configuration for the verifier
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Raw byte length of the challenge token (hex-doubled on the wire)
    pub challenge_bytes: usize,
    /// Timeout for the outbound challenge request
    pub request_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            challenge_bytes: 16,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Challenge/response verification service
pub struct VerifierService {
    config: VerifierConfig,
    registry: Arc<SubscriberRegistry>,
    http: reqwest::Client,
}

impl VerifierService {
    /// Create a new verifier backed by the given registry
    pub fn new(config: VerifierConfig, registry: Arc<SubscriberRegistry>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| HeraldError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            config,
            registry,
            http,
        })
    }

    /// Verify a pending subscription request
    ///
    /// Returns true if the subscriber echoed the challenge and was
    /// admitted to the registry. The registry lock is taken only for
    /// the append, after the network round trip has completed.
    pub async fn verify(&self, sub: Subscriber) -> bool {
        info!(callback = %sub.callback_url, topic = %sub.topic, "Verifying subscriber");

        let challenge = signing::generate_challenge(self.config.challenge_bytes);
        let verification_url = match build_verification_url(&sub, &challenge) {
            Ok(url) => url,
            Err(e) => {
                warn!(callback = %sub.callback_url, error = %e, "Failed to build verification URL");
                return false;
            }
        };

        let response = match self.http.get(&verification_url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(callback = %sub.callback_url, error = %e, "Verification request failed");
                return false;
            }
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(callback = %sub.callback_url, error = %e, "Failed to read challenge response");
                return false;
            }
        };

        // Exact byte-for-byte match required; an empty body never matches
        if body != challenge {
            warn!(callback = %sub.callback_url, "Challenge verification failed");
            return false;
        }

        info!(callback = %sub.callback_url, "Subscriber verified");
        self.registry.insert(sub);
        true
    }

    /// Run verification on a detached task
    ///
    /// The subscribe handler responds to its caller before verification
    /// completes; in-flight verifications are abandoned at shutdown.
    pub fn spawn_verification(self: &Arc<Self>, sub: Subscriber) {
        let verifier = Arc::clone(self);
        tokio::spawn(async move {
            verifier.verify(sub).await;
        });
    }

    /// Registry this verifier admits into
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }
}

/// Append the hub.mode/hub.topic/hub.challenge query to a callback URL
fn build_verification_url(sub: &Subscriber, challenge: &str) -> Result<String> {
    let query = serde_urlencoded::to_string([
        ("hub.mode", "subscribe"),
        ("hub.topic", sub.topic.as_str()),
        ("hub.challenge", challenge),
    ])
    .map_err(|e| HeraldError::Internal(format!("Query encode error: {}", e)))?;

    Ok(format!("{}?{}", sub.callback_url, query))
}
