//! Delivery signing and challenge generation
//!
//! Signing: HMAC-SHA256 over the exact serialized payload bytes, keyed
//! by the subscriber's shared secret, hex-encoded. Deliveries carry it
//! in the `X-Hub-Signature` header as `sha256=<hex>`.
//!
//! Challenges: fixed-length random tokens, hex-encoded, generated per
//! verification attempt and never stored.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the HMAC-SHA256 signature of a message, hex-encoded
pub fn sign(secret: &str, message: &[u8]) -> String {
    // new_from_slice only fails for oversized keys under hash
    // implementations with a key limit; HMAC accepts any key length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Build the `X-Hub-Signature` header value for a payload
pub fn signature_header(secret: &str, message: &[u8]) -> String {
    format!("sha256={}", sign(secret, message))
}

/// Generate a random hex-encoded challenge token of `n` bytes (2n chars)
pub fn generate_challenge(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
