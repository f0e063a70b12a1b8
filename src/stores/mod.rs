//! Store seams consumed by the broker.
//!
//! The service-key store is the origin of long-lived UAA credentials; the
//! session store is the mutable working copy the broker writes back into.

pub mod file;
pub mod memory;

pub use file::{FileServiceKeyStore, FileSessionStore};
pub use memory::{MemoryServiceKeyStore, MemorySessionStore};

use async_trait::async_trait;

use crate::config::types::{AuthorizationConfig, ConnectionConfig};
use crate::error::StoreError;

/// Resolves a destination to its bootstrap credentials.
#[async_trait]
pub trait ServiceKeyStore: Send + Sync {
    async fn get_authorization_config(&self, destination: &str) -> Result<Option<AuthorizationConfig>, StoreError>;

    async fn get_connection_config(&self, destination: &str) -> Result<Option<ConnectionConfig>, StoreError>;
}

/// Holds the current token, refresh token and UAA credentials of a destination.
///
/// The broker never mutates a returned value in place; it builds a new
/// config and writes it through the `set_*` methods.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_authorization_config(&self, destination: &str) -> Result<Option<AuthorizationConfig>, StoreError>;

    async fn set_authorization_config(&self, destination: &str, config: AuthorizationConfig) -> Result<(), StoreError>;

    async fn get_connection_config(&self, destination: &str) -> Result<Option<ConnectionConfig>, StoreError>;

    async fn set_connection_config(&self, destination: &str, config: ConnectionConfig) -> Result<(), StoreError>;

    /// Removes everything stored for the destination.
    async fn delete_session(&self, _destination: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
