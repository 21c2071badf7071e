//! User lookup by login

use crate::filter::login_filter;
use crate::session::LdapSession;
use nestor_core::types::{DirectoryEntry, SearchRequest};
use nestor_core::{Result, GLOBAL_CATALOG_PORT};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSearch {
    /// Subtree search of the domain base
    Default,
    /// Forest-wide lookup through the Global Catalog
    ActiveDirectory,
}

impl UserSearch {
    /// Entries whose login attribute equals `login`, at most one
    pub async fn perform(&self, session: &LdapSession, base: &str, login: &str) -> Result<Vec<DirectoryEntry>> {
        let filter = login_filter(session.uid(), login);

        match self {
            UserSearch::Default => {
                session
                    .search(&SearchRequest::new(base, filter).size_limit(1))
                    .await
            }
            UserSearch::ActiveDirectory => {
                let options = session.connection_options();
                let options = options.for_host(options.host.clone(), GLOBAL_CATALOG_PORT);
                debug!("Searching Global Catalog {} for {}", options.url(), login);

                let global_catalog = session.connections().get_connection(&options)?;
                let response = global_catalog
                    .search(&SearchRequest::new("", filter).size_limit(1))
                    .await?;
                Ok(response.entries)
            }
        }
    }
}
