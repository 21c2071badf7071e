//! Directory client seam
//!
//! Everything above this module talks to a directory through
//! [`DirectoryClient`]. The ldap3-backed implementation lives in
//! [`crate::connection`]; forest fan-out and tests provide their own.

use async_trait::async_trait;
use nestor_core::config::{DirectoryConfig, Encryption};
use nestor_core::types::{DirectoryEntry, SearchRequest, SearchResponse};
use nestor_core::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A directory that can be searched and bound against
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Run a search
    ///
    /// A missing base object reads as an empty response rather than an error.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// Verify a DN/password pair without disturbing the search identity
    async fn bind(&self, dn: &str, password: &str) -> Result<bool>;

    /// Read the root DSE (base-scope search of the empty DN)
    async fn root_dse(&self) -> Result<DirectoryEntry>;
}

/// Opens directory clients for a set of connection options
pub trait Connector: Send + Sync {
    fn connect(&self, options: &ConnectionOptions) -> Result<Arc<dyn DirectoryClient>>;
}

/// Everything needed to open an authenticated connection
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub host: String,
    pub port: u16,
    pub encryption: Encryption,
    pub admin_user: String,
    pub admin_password: String,
    pub timeout: Duration,
}

impl ConnectionOptions {
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            encryption: config.encryption,
            admin_user: config.admin_user.clone(),
            admin_password: config.admin_password.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Same credentials and encryption against another server
    pub fn for_host(&self, host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..self.clone()
        }
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.encryption.scheme(), self.host, self.port)
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("encryption", &self.encryption)
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}
