use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::token::CachedToken;

/// Destination -> token map. Expiry is checked on read, there is no sweeper.
///
/// Clones share the same map, so brokers handed the same cache share keys.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<RwLock<HashMap<String, CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Overwrites any previous entry for the destination.
    pub async fn set(&self, destination: &str, token: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        let mut map = self.inner.write().await;
        map.insert(destination.to_string(), CachedToken::new(token, expires_at));
    }

    /// Token if present and not expired; an expired entry is evicted.
    pub async fn get(&self, destination: &str) -> Option<CachedToken> {
        {
            let map = self.inner.read().await;
            match map.get(destination) {
                None => return None,
                Some(cached) if !cached.is_expired() => return Some(cached.clone()),
                Some(_) => {}
            }
        }

        let mut map = self.inner.write().await;
        // re-check under the write lock, a writer may have replaced it meanwhile
        if map.get(destination).is_some_and(|c| c.is_expired()) {
            debug!(destination, "evicting expired token");
            map.remove(destination);
        }
        map.get(destination).cloned()
    }

    pub async fn clear(&self, destination: &str) {
        self.inner.write().await.remove(destination);
    }

    pub async fn clear_all(&self) {
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
