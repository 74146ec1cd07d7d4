//! Configuration for Herald
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Herald - WebSub-style publish/subscribe hub
#[derive(Parser, Debug, Clone)]
#[command(name = "herald")]
#[command(about = "Publish/subscribe hub with challenge verification and signed fan-out")]
pub struct Args {
    /// Unique node identifier for this hub instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL of the external resubscription helper service
    /// Herald forwards /resub there and fetches /log after deliveries
    #[arg(long, env = "CLIENT_URL", default_value = "http://web-sub-client:8080")]
    pub client_url: String,

    /// Timeout in milliseconds for all outbound HTTP calls
    /// (challenge verification, content delivery, collaborator calls)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Maximum number of concurrent delivery tasks during fan-out
    #[arg(long, env = "FANOUT_LIMIT", default_value = "32")]
    pub fanout_limit: usize,

    /// Length in bytes of the random verification challenge (hex-doubled on the wire)
    #[arg(long, env = "CHALLENGE_BYTES", default_value = "16")]
    pub challenge_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fanout_limit == 0 {
            return Err("FANOUT_LIMIT must be at least 1".to_string());
        }

        if self.challenge_bytes == 0 {
            return Err("CHALLENGE_BYTES must be at least 1".to_string());
        }

        if self.client_url.is_empty() {
            return Err("CLIENT_URL must not be empty".to_string());
        }

        Ok(())
    }
}
