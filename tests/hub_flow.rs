//! End-to-end hub flow: subscribe, verify, publish, deliver.
//!
//! Runs the full HTTP server on an ephemeral port against stub
//! subscriber endpoints.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use clap::Parser;
use herald::config::Args;
use herald::registry::SubscriberRegistry;
use herald::server::{self, AppState};
use herald::signing;
use herald::testing::{spawn_stub_subscriber, StubBehavior};

/// Start a hub on an ephemeral port, returning its base URL and a
/// handle to its registry.
async fn start_hub(client_url: &str) -> (String, Arc<SubscriberRegistry>) {
    let args = Args::parse_from([
        "herald",
        "--listen",
        "127.0.0.1:0",
        "--client-url",
        client_url,
        "--request-timeout-ms",
        "2000",
    ]);
    let state = Arc::new(AppState::new(args).unwrap());
    let registry = Arc::clone(&state.registry);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state));

    (format!("http://{}", addr), registry)
}

/// Poll until the registry reaches `n` subscribers, up to ~2 seconds
async fn wait_for_registry(registry: &SubscriberRegistry, n: usize) {
    for _ in 0..200 {
        if registry.len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn subscribe_with_missing_fields_is_rejected() {
    let stub = spawn_stub_subscriber(StubBehavior::EchoChallenge).await;
    let (hub, registry) = start_hub(&stub.url("")).await;
    let client = reqwest::Client::new();

    // Missing hub.topic
    let response = client
        .post(&hub)
        .form(&[("hub.callback", stub.url("/cb").as_str()), ("hub.secret", "s1")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Empty hub.secret
    let response = client
        .post(&hub)
        .form(&[
            ("hub.callback", stub.url("/cb").as_str()),
            ("hub.secret", ""),
            ("hub.topic", "t1"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    assert!(registry.is_empty());
}

#[tokio::test]
async fn wrong_methods_are_rejected() {
    let stub = spawn_stub_subscriber(StubBehavior::EchoChallenge).await;
    let (hub, _registry) = start_hub(&stub.url("")).await;
    let client = reqwest::Client::new();

    let response = client.get(&hub).send().await.unwrap();
    assert_eq!(response.status(), 405);

    let response = client
        .post(format!("{}/publish", hub))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);
}

#[tokio::test]
async fn echoing_subscriber_is_verified_and_receives_signed_content() {
    let stub = spawn_stub_subscriber(StubBehavior::EchoChallenge).await;
    let (hub, registry) = start_hub(&stub.url("")).await;
    let client = reqwest::Client::new();

    let response = client
        .post(&hub)
        .form(&[
            ("hub.callback", stub.url("/cb").as_str()),
            ("hub.secret", "s1"),
            ("hub.topic", "t1"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Subscription request received.");

    // Verification runs after the response; wait for admission
    wait_for_registry(&registry, 1).await;
    assert_eq!(registry.len(), 1);

    let response = client
        .get(format!("{}/publish", hub))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "Content published to 1 verified subscribers.\n"
    );

    // The delivery POST carries a signature over the exact payload bytes
    let deliveries = stub.wait_for_deliveries(1).await;
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert_eq!(delivery.path, "/cb");
    assert_eq!(delivery.content_type.as_deref(), Some("application/json"));
    let expected = format!("sha256={}", signing::sign("s1", &delivery.body));
    assert_eq!(delivery.signature.as_deref(), Some(expected.as_str()));
}

#[tokio::test]
async fn failing_callback_is_never_admitted() {
    let failing = spawn_stub_subscriber(StubBehavior::NotFound).await;
    let (hub, registry) = start_hub(&failing.url("")).await;
    let client = reqwest::Client::new();

    let response = client
        .post(&hub)
        .form(&[
            ("hub.callback", failing.url("/cb").as_str()),
            ("hub.secret", "s1"),
            ("hub.topic", "t1"),
        ])
        .send()
        .await
        .unwrap();
    // The caller is acknowledged regardless; verification fails silently
    assert_eq!(response.status(), 200);

    // Give the backgrounded verification time to run and fail
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(registry.is_empty());

    let response = client
        .get(format!("{}/publish", hub))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.text().await.unwrap(),
        "Content published to 0 verified subscribers.\n"
    );
}

#[tokio::test]
async fn health_reports_subscriber_count() {
    let stub = spawn_stub_subscriber(StubBehavior::EchoChallenge).await;
    let (hub, registry) = start_hub(&stub.url("")).await;
    let client = reqwest::Client::new();

    client
        .post(&hub)
        .form(&[
            ("hub.callback", stub.url("/cb").as_str()),
            ("hub.secret", "s1"),
            ("hub.topic", "t1"),
        ])
        .send()
        .await
        .unwrap();
    wait_for_registry(&registry, 1).await;

    let response = client
        .get(format!("{}/health", hub))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["healthy"], true);
    assert_eq!(body["subscribers"], 1);
}
