//! Test support: stub subscriber endpoints
//!
//! Spawns a minimal hyper server on an ephemeral port that plays the
//! role of a subscriber callback. Challenge GETs are answered according
//! to the configured behavior; content POSTs are recorded so tests can
//! assert on delivered bodies and signature headers.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// How the stub answers challenge GETs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    /// Echo the hub.challenge query parameter back verbatim
    EchoChallenge,
    /// Respond 200 with a body that never matches the challenge
    WrongEcho,
    /// Respond 200 with an empty body
    EmptyBody,
    /// Respond 404 to everything
    NotFound,
}

/// A content delivery recorded by the stub
#[derive(Debug, Clone)]
pub struct ReceivedDelivery {
    pub path: String,
    pub content_type: Option<String>,
    pub signature: Option<String>,
    pub body: Bytes,
}

/// Handle to a running stub subscriber
pub struct StubSubscriber {
    addr: SocketAddr,
    deliveries: Arc<Mutex<Vec<ReceivedDelivery>>>,
}

impl StubSubscriber {
    /// Full URL for a path on this stub
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliveries received so far
    pub fn deliveries(&self) -> Vec<ReceivedDelivery> {
        self.deliveries.lock().expect("stub lock poisoned").clone()
    }

    /// Wait until at least `n` deliveries have arrived, up to ~2 seconds
    pub async fn wait_for_deliveries(&self, n: usize) -> Vec<ReceivedDelivery> {
        for _ in 0..200 {
            let current = self.deliveries();
            if current.len() >= n {
                return current;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.deliveries()
    }
}

/// Spawn a stub subscriber on an ephemeral local port
pub async fn spawn_stub_subscriber(behavior: StubBehavior) -> StubSubscriber {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    let deliveries: Arc<Mutex<Vec<ReceivedDelivery>>> = Arc::new(Mutex::new(Vec::new()));

    let task_deliveries = Arc::clone(&deliveries);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let deliveries = Arc::clone(&task_deliveries);
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let deliveries = Arc::clone(&deliveries);
                    async move { handle_stub_request(req, behavior, deliveries).await }
                });
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    StubSubscriber { addr, deliveries }
}

async fn handle_stub_request(
    req: Request<Incoming>,
    behavior: StubBehavior,
    deliveries: Arc<Mutex<Vec<ReceivedDelivery>>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if behavior == StubBehavior::NotFound {
        return Ok(status_response(StatusCode::NOT_FOUND, "not found"));
    }

    let method = req.method().clone();
    match method {
        // Challenge verification GET
        Method::GET => {
            let challenge = req
                .uri()
                .query()
                .and_then(|q| {
                    serde_urlencoded::from_str::<Vec<(String, String)>>(q)
                        .ok()?
                        .into_iter()
                        .find(|(k, _)| k == "hub.challenge")
                        .map(|(_, v)| v)
                })
                .unwrap_or_default();

            let body = match behavior {
                StubBehavior::EchoChallenge => challenge,
                StubBehavior::WrongEcho => "not-the-challenge".to_string(),
                StubBehavior::EmptyBody => String::new(),
                StubBehavior::NotFound => unreachable!(),
            };
            Ok(status_response(StatusCode::OK, &body))
        }

        // Content delivery POST
        Method::POST => {
            let path = req.uri().path().to_string();
            let content_type = header_string(&req, "Content-Type");
            let signature = header_string(&req, "X-Hub-Signature");
            let body = match req.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(_) => Bytes::new(),
            };

            deliveries
                .lock()
                .expect("stub lock poisoned")
                .push(ReceivedDelivery {
                    path,
                    content_type,
                    signature,
                    body,
                });

            Ok(status_response(StatusCode::OK, "ok"))
        }

        _ => Ok(status_response(StatusCode::METHOD_NOT_ALLOWED, "")),
    }
}

fn header_string(req: &Request<Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn status_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}
