//! Subscription, publish, and resubscription handlers
//!
//! The subscribe handler validates the URL-encoded form, acknowledges
//! the caller immediately, and runs challenge verification on a
//! detached task. The publish handler reports the registry snapshot
//! count taken before fan-out began. The resub handler forwards to the
//! external resubscription helper, best-effort.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::registry::Subscriber;
use crate::server::AppState;
use crate::types::{HeraldError, Result};

/// URL-encoded subscription request body
#[derive(Debug, Deserialize)]
struct SubscribeForm {
    #[serde(rename = "hub.callback", default)]
    callback: String,
    #[serde(rename = "hub.secret", default)]
    secret: String,
    #[serde(rename = "hub.topic", default)]
    topic: String,
}

/// Parse and validate a URL-encoded subscribe body into a Subscriber
///
/// The callback, topic, and secret are all required: a delivery
/// signature is meaningless without a shared secret.
pub fn parse_subscribe_form(body: &[u8]) -> Result<Subscriber> {
    let form: SubscribeForm = serde_urlencoded::from_bytes(body)?;

    if form.callback.is_empty() || form.topic.is_empty() || form.secret.is_empty() {
        return Err(HeraldError::BadRequest(
            "Missing subscriber data: hub.callback, hub.secret, and hub.topic are required"
                .to_string(),
        ));
    }

    Ok(Subscriber {
        callback_url: form.callback,
        secret: form.secret,
        topic: form.topic,
    })
}

/// Handle POST / subscription requests
pub async fn handle_subscribe(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "Failed to read subscribe request body");
            return error_response(HeraldError::BadRequest(
                "Failed to read request body".to_string(),
            ));
        }
    };

    let sub = match parse_subscribe_form(&body) {
        Ok(sub) => sub,
        Err(e) => {
            warn!(error = %e, "Rejected subscribe request");
            return error_response(e);
        }
    };

    info!(callback = %sub.callback_url, topic = %sub.topic, "Subscription request received");

    // Acknowledge first; verification runs on a detached task
    state.verifier.spawn_verification(sub);

    text_response(StatusCode::OK, "Subscription request received.")
}

/// Handle GET /publish fan-out triggers
pub async fn handle_publish(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.publisher.publish().await {
        Ok(count) => text_response(
            StatusCode::OK,
            &format!("Content published to {} verified subscribers.\n", count),
        ),
        Err(e) => {
            error!(error = %e, "Publish failed");
            error_response(HeraldError::Internal("Publish failed".to_string()))
        }
    }
}

/// Handle GET /resub forwarding to the resubscription helper
pub async fn handle_resub(state: Arc<AppState>) -> Response<Full<Bytes>> {
    // Best-effort: the outcome is logged, the caller always gets an ack
    if let Err(e) = state.collaborator.trigger_resub().await {
        warn!(error = %e, "Resubscription trigger failed");
    }
    text_response(StatusCode::OK, "Resubscription triggered.")
}

/// Plain-text response
pub fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}

/// JSON error response derived from a HeraldError
pub fn error_response(err: HeraldError) -> Response<Full<Bytes>> {
    let (status, message) = err.into_status_code_and_body();
    let body = serde_json::json!({
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": message,
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_form() {
        let body = b"hub.callback=http%3A%2F%2Fsub1%2Fcb&hub.secret=s1&hub.topic=t1";
        let sub = parse_subscribe_form(body).unwrap();
        assert_eq!(sub.callback_url, "http://sub1/cb");
        assert_eq!(sub.secret, "s1");
        assert_eq!(sub.topic, "t1");
    }

    #[test]
    fn test_parse_rejects_missing_callback() {
        let body = b"hub.secret=s1&hub.topic=t1";
        assert!(parse_subscribe_form(body).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_topic() {
        let body = b"hub.callback=http%3A%2F%2Fsub1%2Fcb&hub.secret=s1";
        assert!(parse_subscribe_form(body).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_secret() {
        let body = b"hub.callback=http%3A%2F%2Fsub1%2Fcb&hub.secret=&hub.topic=t1";
        assert!(parse_subscribe_form(body).is_err());
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let body = b"hub.callback=http%3A%2F%2Fsub1%2Fcb&hub.secret=s1&hub.topic=t1&hub.extra=1";
        let sub = parse_subscribe_form(body).unwrap();
        assert_eq!(sub.topic, "t1");
    }

    #[test]
    fn test_error_response_is_json_with_status() {
        let response = error_response(HeraldError::BadRequest("nope".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
