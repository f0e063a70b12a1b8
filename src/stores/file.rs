use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::config::types::{AuthorizationConfig, ConnectionConfig, SessionKind};
use crate::error::StoreError;
use crate::stores::{ServiceKeyStore, SessionStore};
use crate::utils::constants::AUTH_BROKER_PATH_ENV;

/// Directories named by `AUTH_BROKER_PATH`, split on `;` when present, otherwise on `:`.
pub fn search_paths_from_env() -> Vec<PathBuf> {
    std::env::var(AUTH_BROKER_PATH_ENV)
        .map(|raw| split_search_path(&raw))
        .unwrap_or_default()
}

pub fn split_search_path(raw: &str) -> Vec<PathBuf> {
    let separator = if raw.contains(';') { ';' } else { ':' };
    raw.split(separator)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// ================================
/// Service keys
/// ================================

/// SAP service key as downloaded from the BTP cockpit.
#[derive(Debug, Clone, Deserialize)]
struct ServiceKeyFile {
    uaa: UaaSection,
    url: Option<String>,
    #[serde(default, alias = "sapClient")]
    sap_client: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UaaSection {
    #[serde(default)]
    url: String,
    #[serde(default)]
    clientid: String,
    #[serde(default)]
    clientsecret: String,
}

/// Reads `<destination>.json` from the first search directory holding it.
#[derive(Debug, Clone)]
pub struct FileServiceKeyStore {
    search_paths: Vec<PathBuf>,
}

impl FileServiceKeyStore {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Uses `AUTH_BROKER_PATH`, falling back to the working directory.
    pub fn from_env() -> Self {
        let mut paths = search_paths_from_env();
        if paths.is_empty() {
            paths.push(PathBuf::from("."));
        }
        Self::new(paths)
    }

    fn locate(&self, destination: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(format!("{}.json", destination)))
            .find(|p| p.is_file())
    }

    async fn load(&self, destination: &str) -> Result<Option<ServiceKeyFile>, StoreError> {
        let Some(path) = self.locate(destination) else {
            debug!(destination, "no service key file found");
            return Ok(None);
        };
        let content = fs::read_to_string(&path).await?;
        let key: ServiceKeyFile = serde_json::from_str(&content)?;
        debug!(destination, path = %path.display(), "service key loaded");
        Ok(Some(key))
    }
}

#[async_trait]
impl ServiceKeyStore for FileServiceKeyStore {
    async fn get_authorization_config(&self, destination: &str) -> Result<Option<AuthorizationConfig>, StoreError> {
        Ok(self
            .load(destination)
            .await?
            .map(|key| AuthorizationConfig::new(key.uaa.url, key.uaa.clientid, key.uaa.clientsecret)))
    }

    async fn get_connection_config(&self, destination: &str) -> Result<Option<ConnectionConfig>, StoreError> {
        Ok(self.load(destination).await?.map(|key| ConnectionConfig {
            service_url: key.url,
            authorization_token: String::new(),
            sap_client: key.sap_client,
            language: key.language,
        }))
    }
}

/// ================================
/// Sessions
/// ================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    kind: SessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authorization: Option<AuthorizationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection: Option<ConnectionConfig>,
}

/// One `<destination>.session.json` per destination, written atomically with 0600 permissions.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
    kind: SessionKind,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>, kind: SessionKind) -> Self {
        Self { dir: dir.into(), kind }
    }

    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.dir.join(format!("{}.session.json", destination))
    }

    /// A session written for another kind is an error, not a miss.
    async fn read(&self, destination: &str) -> Result<Option<SessionFile>, StoreError> {
        let session: SessionFile = match fs::read_to_string(self.path_for(destination)).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if session.kind != self.kind {
            return Err(StoreError::Other(format!(
                "session for '{}' is of kind '{}', expected '{}'",
                destination,
                session.kind.as_str(),
                self.kind.as_str()
            )));
        }
        Ok(Some(session))
    }

    async fn update<F>(&self, destination: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut SessionFile),
    {
        let mut session = self.read(destination).await?.unwrap_or(SessionFile {
            kind: self.kind,
            authorization: None,
            connection: None,
        });
        apply(&mut session);
        let content = serde_json::to_vec_pretty(&session)?;
        write_atomic(&self.path_for(destination), &content).await?;
        info!(destination, "session persisted");
        Ok(())
    }
}

async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }
    fs::rename(&tmp, path).await
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_authorization_config(&self, destination: &str) -> Result<Option<AuthorizationConfig>, StoreError> {
        Ok(self.read(destination).await?.and_then(|s| s.authorization))
    }

    async fn set_authorization_config(&self, destination: &str, config: AuthorizationConfig) -> Result<(), StoreError> {
        self.update(destination, |s| s.authorization = Some(config)).await
    }

    async fn get_connection_config(&self, destination: &str) -> Result<Option<ConnectionConfig>, StoreError> {
        Ok(self.read(destination).await?.and_then(|s| s.connection))
    }

    async fn set_connection_config(&self, destination: &str, config: ConnectionConfig) -> Result<(), StoreError> {
        self.update(destination, |s| s.connection = Some(config)).await
    }

    async fn delete_session(&self, destination: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(destination)).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
