//! HTTP routes for Herald

pub mod health;
pub mod hub;

pub use health::{health_check, version_info};
pub use hub::{handle_publish, handle_resub, handle_subscribe};
