//! Subscriber registry
//!
//! In-memory, append-only store of verified subscribers. The registry is
//! the only shared mutable state in the hub: the verifier appends on
//! successful challenge verification, the publisher snapshots before
//! fan-out. The lock is held only for the append or the copy, never
//! across a network call.
//!
//! Duplicate (callback_url, topic) pairs are allowed: each successful
//! verification appends unconditionally, and entries are never removed.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A verified subscriber eligible to receive publications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscriber {
    /// HTTP endpoint that receives challenges and content deliveries
    pub callback_url: String,
    /// Shared key used to sign deliveries to this subscriber
    pub secret: String,
    /// Subject the subscriber registered for
    pub topic: String,
}

/// Thread-safe, append-only registry of verified subscribers
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Append a verified subscriber
    pub fn insert(&self, sub: Subscriber) {
        let mut guard = self.subscribers.lock().expect("registry lock poisoned");
        guard.push(sub);
    }

    /// Take a point-in-time copy of all verified subscribers
    ///
    /// Iterating the copy never races with a concurrent insert.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        let guard = self.subscribers.lock().expect("registry lock poisoned");
        guard.clone()
    }

    /// Number of verified subscribers
    pub fn len(&self) -> usize {
        let guard = self.subscribers.lock().expect("registry lock poisoned");
        guard.len()
    }

    /// Whether the registry holds no subscribers
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sub(callback: &str) -> Subscriber {
        Subscriber {
            callback_url: callback.to_string(),
            secret: "s3cret".to_string(),
            topic: "news".to_string(),
        }
    }

    #[test]
    fn test_starts_empty() {
        let registry = SubscriberRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.snapshot().len(), 0);
    }

    #[test]
    fn test_insert_and_snapshot() {
        let registry = SubscriberRegistry::new();
        registry.insert(sub("http://a/cb"));
        registry.insert(sub("http://b/cb"));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].callback_url, "http://a/cb");
        assert_eq!(snapshot[1].callback_url, "http://b/cb");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let registry = SubscriberRegistry::new();
        registry.insert(sub("http://a/cb"));
        registry.insert(sub("http://a/cb"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = SubscriberRegistry::new();
        registry.insert(sub("http://a/cb"));

        let snapshot = registry.snapshot();
        registry.insert(sub("http://b/cb"));

        // A snapshot taken before an insert does not see it
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_are_not_lost() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for j in 0..100 {
                    registry.insert(sub(&format!("http://sub-{}-{}/cb", i, j)));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 800);
    }
}
