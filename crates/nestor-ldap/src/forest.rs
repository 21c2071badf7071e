//! Forest-wide search across ActiveDirectory domain controllers
//!
//! The partitions container under the configuration naming context lists
//! one entry per domain in the forest. Each becomes a naming context DN
//! mapped to a connection on that domain's DNS root. A search is then sent
//! to every domain controller whose naming context is a suffix of the
//! search base. Without a forest the base connection answers directly.

use crate::capabilities::Capabilities;
use crate::client::{ConnectionOptions, DirectoryClient};
use crate::connection_cache::ConnectionCache;
use async_trait::async_trait;
use futures::future::try_join_all;
use nestor_core::types::{dn_ends_with, DirectoryEntry, Filter, SearchRequest, SearchResponse};
use nestor_core::{Result, DEFAULT_LDAPS_PORT, DEFAULT_LDAP_PORT};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A domain of the forest and the connection serving it
struct ForestDomain {
    naming_context: String,
    connection: Arc<dyn DirectoryClient>,
}

pub struct ForestSearch {
    connection: Arc<dyn DirectoryClient>,
    capabilities: Arc<Capabilities>,
    connections: Arc<ConnectionCache>,
    options: ConnectionOptions,
    forest: OnceCell<Vec<ForestDomain>>,
}

impl ForestSearch {
    pub fn new(
        connection: Arc<dyn DirectoryClient>,
        capabilities: Arc<Capabilities>,
        connections: Arc<ConnectionCache>,
        options: ConnectionOptions,
    ) -> Self {
        Self {
            connection,
            capabilities,
            connections,
            options,
            forest: OnceCell::new(),
        }
    }

    /// Naming contexts of the discovered forest
    pub async fn naming_contexts(&self) -> Result<Vec<String>> {
        Ok(self
            .forest()
            .await?
            .iter()
            .map(|d| d.naming_context.clone())
            .collect())
    }

    async fn forest(&self) -> Result<&[ForestDomain]> {
        let forest = self
            .forest
            .get_or_try_init(|| self.discover())
            .await?;
        Ok(forest.as_slice())
    }

    async fn discover(&self) -> Result<Vec<ForestDomain>> {
        let Some(configuration) = self.capabilities.configuration_naming_context().await else {
            debug!("No configuration naming context, searching without a forest");
            return Ok(Vec::new());
        };

        let request = SearchRequest::new(configuration, Filter::present("nETBIOSName"))
            .attributes(["nCName", "dnsRoot", "nETBIOSName"])
            .return_referrals(true);
        let partitions = self.connection.search(&request).await?;

        let port = if self.options.encryption.is_encrypted() {
            DEFAULT_LDAPS_PORT
        } else {
            DEFAULT_LDAP_PORT
        };

        let mut forest = Vec::new();
        for partition in &partitions.entries {
            let (Some(naming_context), Some(dns_root)) = (partition.first("nCName"), partition.first("dnsRoot")) else {
                continue;
            };

            let connection = self
                .connections
                .get_connection(&self.options.for_host(dns_root, port))?;
            forest.push(ForestDomain {
                naming_context: naming_context.to_string(),
                connection,
            });
        }

        info!("Discovered {} domains in the forest", forest.len());
        Ok(forest)
    }
}

#[async_trait]
impl DirectoryClient for ForestSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let forest = self.forest().await?;
        if forest.is_empty() {
            return self.connection.search(request).await;
        }

        let searches = forest
            .iter()
            .filter(|d| dn_ends_with(&request.base, &d.naming_context))
            .map(|d| {
                debug!("Searching {} in naming context {}", request.base, d.naming_context);
                d.connection.search(request)
            });

        let responses = try_join_all(searches).await?;
        Ok(responses
            .into_iter()
            .fold(SearchResponse::default(), |mut acc, response| {
                acc.entries.extend(response.entries);
                acc.referrals.extend(response.referrals);
                acc
            }))
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<bool> {
        self.connection.bind(dn, password).await
    }

    async fn root_dse(&self) -> Result<DirectoryEntry> {
        self.connection.root_dse().await
    }
}
