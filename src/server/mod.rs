//! HTTP server for Herald

pub mod http;

pub use http::{run, serve, AppState};
