//! Herald - WebSub-style publish/subscribe hub
//!
//! Herald accepts subscription requests, verifies that the subscriber
//! controls its callback URL via a random challenge echoed back, and
//! fans out HMAC-SHA256-signed content notifications to every verified
//! subscriber.
//!
//! ## Services
//!
//! - **Registry**: append-only in-memory store of verified subscribers
//! - **Verifier**: challenge/response verification of callback ownership
//! - **Publisher**: bounded concurrent delivery of signed payloads
//! - **Collaborator**: client for the external resubscription helper

pub mod collaborator;
pub mod config;
pub mod publisher;
pub mod registry;
pub mod routes;
pub mod server;
pub mod signing;
pub mod testing;
pub mod types;
pub mod verifier;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{HeraldError, Result};
