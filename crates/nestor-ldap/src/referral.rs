//! Referral chasing
//!
//! A search that answers with a referral is re-issued once against the
//! server the first referral URL names, with the URL's DN as the new base.
//! The connection reuses the service credentials and comes from the shared
//! cache. Referrals returned by the chased search are not followed.

use crate::client::{ConnectionOptions, DirectoryClient};
use crate::connection_cache::ConnectionCache;
use crate::url::LdapUrl;
use nestor_core::types::{DirectoryEntry, SearchRequest};
use nestor_core::Result;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ReferralChaser {
    connection: Arc<dyn DirectoryClient>,
    connections: Arc<ConnectionCache>,
    options: ConnectionOptions,
}

impl ReferralChaser {
    pub fn new(
        connection: Arc<dyn DirectoryClient>,
        connections: Arc<ConnectionCache>,
        options: ConnectionOptions,
    ) -> Self {
        Self {
            connection,
            connections,
            options,
        }
    }

    /// Search, following the first referral if the server returns one
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        let request = request.clone().return_referrals(true);
        let response = self.connection.search(&request).await?;

        let Some(first) = response.referrals.first() else {
            return Ok(response.entries);
        };

        let url = match LdapUrl::parse(first) {
            Ok(url) => url,
            Err(e) => {
                warn!("Ignoring referral for {}: {}", request.base, e);
                return Ok(response.entries);
            }
        };

        let port = url.explicit_port().unwrap_or(self.options.port);
        debug!("Chasing referral {} to {}:{}", url, url.host(), port);

        let referral = self
            .connections
            .get_connection(&self.options.for_host(url.host(), port))?;
        let chased = referral.search(&request.with_base(url.dn())).await?;

        Ok(chased.entries)
    }
}
