use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::types::{AuthorizationConfig, ConnectionConfig};
use crate::error::StoreError;
use crate::stores::{ServiceKeyStore, SessionStore};

#[derive(Debug, Clone, Default)]
struct SessionEntry {
    authorization: Option<AuthorizationConfig>,
    connection: Option<ConnectionConfig>,
}

/// Session store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, destination: &str) -> bool {
        self.inner.read().await.contains_key(destination)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_authorization_config(&self, destination: &str) -> Result<Option<AuthorizationConfig>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .get(destination)
            .and_then(|e| e.authorization.clone()))
    }

    async fn set_authorization_config(&self, destination: &str, config: AuthorizationConfig) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        map.entry(destination.to_string()).or_default().authorization = Some(config);
        Ok(())
    }

    async fn get_connection_config(&self, destination: &str) -> Result<Option<ConnectionConfig>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .get(destination)
            .and_then(|e| e.connection.clone()))
    }

    async fn set_connection_config(&self, destination: &str, config: ConnectionConfig) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        map.entry(destination.to_string()).or_default().connection = Some(config);
        Ok(())
    }

    async fn delete_session(&self, destination: &str) -> Result<(), StoreError> {
        self.inner.write().await.remove(destination);
        Ok(())
    }
}

/// Service keys registered in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryServiceKeyStore {
    inner: Arc<RwLock<HashMap<String, (AuthorizationConfig, ConnectionConfig)>>>,
}

impl MemoryServiceKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, destination: &str, authorization: AuthorizationConfig, connection: ConnectionConfig) {
        self.inner
            .write()
            .await
            .insert(destination.to_string(), (authorization, connection));
    }
}

#[async_trait]
impl ServiceKeyStore for MemoryServiceKeyStore {
    async fn get_authorization_config(&self, destination: &str) -> Result<Option<AuthorizationConfig>, StoreError> {
        Ok(self.inner.read().await.get(destination).map(|(a, _)| a.clone()))
    }

    async fn get_connection_config(&self, destination: &str) -> Result<Option<ConnectionConfig>, StoreError> {
        Ok(self.inner.read().await.get(destination).map(|(_, c)| c.clone()))
    }
}
