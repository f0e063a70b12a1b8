use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per destination. Calls for the same destination run one
/// at a time; different destinations never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, destination: &str) -> OwnedMutexGuard<()> {
        // the map shard lock is released before awaiting
        let lock = self.locks.entry(destination.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
