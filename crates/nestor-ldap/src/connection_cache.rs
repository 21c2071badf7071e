//! Shared cache of secondary connections
//!
//! Referral targets and forest domain controllers are reached through
//! connections opened on demand. The cache is owned by whoever builds the
//! session and handed in, so independent sessions never share state
//! unless they are given the same cache.

use crate::client::{ConnectionOptions, Connector, DirectoryClient};
use nestor_core::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Connections keyed by server endpoint
pub struct ConnectionCache {
    connector: Arc<dyn Connector>,
    connections: Mutex<HashMap<String, Arc<dyn DirectoryClient>>>,
}

impl ConnectionCache {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached connection for the endpoint, opening it if needed
    ///
    /// The lock is held across creation so concurrent callers for the same
    /// endpoint get the same connection.
    pub fn get_connection(&self, options: &ConnectionOptions) -> Result<Arc<dyn DirectoryClient>> {
        let key = cache_key(options);
        let mut connections = self.connections.lock();

        if let Some(connection) = connections.get(&key) {
            return Ok(connection.clone());
        }

        debug!("Opening connection to {}", options.url());
        let connection = self.connector.connect(options)?;
        connections.insert(key, connection.clone());
        Ok(connection)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    pub fn clear(&self) {
        self.connections.lock().clear();
    }
}

fn cache_key(options: &ConnectionOptions) -> String {
    format!("{}:{}", options.host.to_lowercase(), options.port)
}
