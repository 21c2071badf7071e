//! Root DSE capability detection
//!
//! The root DSE is read at most once per session. A failed read never
//! aborts the caller: it is logged, remembered, and treated as a server
//! that advertises nothing, so strategy detection falls back to the
//! non-AD path.

use crate::client::DirectoryClient;
use nestor_core::types::DirectoryEntry;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub struct Capabilities {
    client: Arc<dyn DirectoryClient>,
    active_directory_oids: Vec<String>,
    root_dse: OnceCell<DirectoryEntry>,
    last_error: Mutex<Option<String>>,
}

impl Capabilities {
    pub fn new(client: Arc<dyn DirectoryClient>, active_directory_oids: Vec<String>) -> Self {
        Self {
            client,
            active_directory_oids,
            root_dse: OnceCell::new(),
            last_error: Mutex::new(None),
        }
    }

    /// Cached root DSE, empty when it could not be read
    pub async fn root_dse(&self) -> &DirectoryEntry {
        self.root_dse
            .get_or_init(|| async {
                match self.client.root_dse().await {
                    Ok(entry) => {
                        debug!(
                            "Root DSE advertises {} capabilities",
                            entry.get("supportedCapabilities").len()
                        );
                        entry
                    }
                    Err(e) => {
                        warn!("Capability detection failed: {}", e);
                        *self.last_error.lock() = Some(e.to_string());
                        DirectoryEntry::new("")
                    }
                }
            })
            .await
    }

    /// Whether `oid` is listed in `supportedCapabilities`
    pub async fn supports(&self, oid: &str) -> bool {
        self.root_dse()
            .await
            .get("supportedCapabilities")
            .iter()
            .any(|c| c == oid)
    }

    pub async fn active_directory_capable(&self) -> bool {
        let supported = self.root_dse().await.get("supportedCapabilities");
        self.active_directory_oids
            .iter()
            .any(|oid| supported.iter().any(|c| c == oid))
    }

    pub async fn configuration_naming_context(&self) -> Option<String> {
        self.root_dse()
            .await
            .first("configurationNamingContext")
            .map(String::from)
    }

    pub async fn default_naming_context(&self) -> Option<String> {
        self.root_dse()
            .await
            .first("defaultNamingContext")
            .map(String::from)
    }

    /// Error recorded by a failed root DSE read
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}
