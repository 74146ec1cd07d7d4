//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; every accepted
//! connection is served on its own task. Routing is a match over
//! (method, path).

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::collaborator::CollaboratorClient;
use crate::config::Args;
use crate::publisher::{Publisher, PublisherConfig};
use crate::registry::SubscriberRegistry;
use crate::routes;
use crate::types::Result;
use crate::verifier::{VerifierConfig, VerifierService};

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Registry of verified subscribers, the only shared mutable state
    pub registry: Arc<SubscriberRegistry>,
    /// Challenge/response verification service
    pub verifier: Arc<VerifierService>,
    /// Signed fan-out publisher
    pub publisher: Arc<Publisher>,
    /// Client for the external resubscription helper
    pub collaborator: Arc<CollaboratorClient>,
    /// Process start time for uptime reporting
    pub started: Instant,
}

impl AppState {
    /// Build all services from configuration
    pub fn new(args: Args) -> Result<Self> {
        let timeout = Duration::from_millis(args.request_timeout_ms);
        let registry = Arc::new(SubscriberRegistry::new());
        let collaborator = Arc::new(CollaboratorClient::new(&args.client_url, timeout)?);

        let verifier = Arc::new(VerifierService::new(
            VerifierConfig {
                challenge_bytes: args.challenge_bytes,
                request_timeout: timeout,
            },
            Arc::clone(&registry),
        )?);

        let publisher = Arc::new(Publisher::new(
            PublisherConfig {
                fanout_limit: args.fanout_limit,
                request_timeout: timeout,
            },
            Arc::clone(&registry),
            Arc::clone(&collaborator),
        )?);

        Ok(Self {
            args,
            registry,
            verifier,
            publisher,
            collaborator,
            started: Instant::now(),
        })
    }
}

/// Start the HTTP server on the configured listen address
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Herald listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    serve(listener, state).await
}

/// Serve connections from an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Subscription registration (ack first, verify on a detached task)
        (Method::POST, "/") => routes::handle_subscribe(req, state).await,

        // Fan-out trigger; responds with the snapshot subscriber count
        (Method::GET, "/publish") => routes::handle_publish(state).await,

        // Forward to the external resubscription helper
        (Method::GET, "/resub") => routes::handle_resub(state).await,

        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state),

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Wrong method on a known path
        (_, "/") => method_not_allowed_response("Only POST is allowed for subscription requests"),
        (_, "/publish") | (_, "/resub") | (_, "/health") | (_, "/healthz") | (_, "/version") => {
            method_not_allowed_response("Only GET is allowed on this path")
        }

        // Not found
        (_, p) => not_found_response(p),
    };

    Ok(response)
}

/// Method not allowed response
fn method_not_allowed_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Method Not Allowed",
        "message": message,
    });

    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "POST / to subscribe, GET /publish to fan out",
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}
