//! ldap3-backed directory client
//!
//! Handles LDAP, LDAPS (SSL) and STARTTLS connections. The search
//! connection is opened and bound with the service account on first use
//! and shared afterwards; password checks always use a fresh connection so
//! the search identity is never replaced.

use crate::client::{ConnectionOptions, Connector, DirectoryClient};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, ResultEntry, Scope, SearchEntry, SearchOptions};
use nestor_core::config::Encryption;
use nestor_core::types::{DirectoryEntry, SearchRequest, SearchResponse, SearchScope};
use nestor_core::{Error, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

// LDAP result codes
const RC_SUCCESS: u32 = 0;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
const RC_REFERRAL: u32 = 10;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Root DSE attributes read by capability detection
const ROOT_DSE_ATTRIBUTES: [&str; 10] = [
    "supportedCapabilities",
    "supportedControl",
    "supportedExtension",
    "supportedLDAPVersion",
    "namingContexts",
    "defaultNamingContext",
    "rootDomainNamingContext",
    "configurationNamingContext",
    "vendorName",
    "vendorVersion",
];

/// Directory client over a real LDAP server
pub struct LdapDirectory {
    options: ConnectionOptions,
    connection: OnceCell<Ldap>,
}

impl LdapDirectory {
    /// Create a client; nothing is opened until the first operation
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            options,
            connection: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Create LDAP connection with proper TLS settings
    async fn create_connection(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.options.timeout)
            .set_starttls(self.options.encryption == Encryption::StartTls);

        let url = self.options.url();
        debug!("Connecting to LDAP server: {}", url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| map_ldap_error(e, &url))?;

        ldap3::drive!(conn);
        Ok(ldap)
    }

    /// Search connection, bound with the service account
    async fn connection(&self) -> Result<Ldap> {
        let ldap = self
            .connection
            .get_or_try_init(|| async {
                let mut ldap = self.create_connection().await?;

                if !self.options.admin_user.is_empty() {
                    let result = ldap
                        .simple_bind(&self.options.admin_user, &self.options.admin_password)
                        .await
                        .map_err(|e| map_ldap_error(e, &self.options.host))?;

                    if result.rc != RC_SUCCESS {
                        return Err(Error::Bind(format!(
                            "Service account bind failed with code: {}",
                            result.rc
                        )));
                    }
                }

                Ok(ldap)
            })
            .await?;

        Ok(ldap.clone())
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut ldap = self.connection().await?;
        if let Some(limit) = request.size_limit {
            ldap.with_search_options(SearchOptions::new().sizelimit(limit));
        }

        let filter = request.filter_string();
        debug!(base = %request.base, scope = %request.scope, "Searching with filter: {}", filter);

        let ldap3::SearchResult(results, status) = ldap
            .search(
                &request.base,
                ldap_scope(request.scope),
                &filter,
                request.attributes.clone(),
            )
            .await
            .map_err(|e| map_ldap_error(e, &self.options.host))?;

        match status.rc {
            RC_SUCCESS | RC_SIZE_LIMIT_EXCEEDED => Ok(convert_results(results, request.return_referrals)),
            RC_REFERRAL if request.return_referrals => Ok(SearchResponse::referral(status.refs)),
            RC_REFERRAL => {
                debug!("Ignoring referral from {}: {:?}", request.base, status.refs);
                Ok(SearchResponse::default())
            }
            RC_NO_SUCH_OBJECT => Ok(SearchResponse::default()),
            rc => Err(Error::Search(format!(
                "Search of {} failed with code {}: {}",
                request.base, rc, status.text
            ))),
        }
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<bool> {
        // An empty password is an unauthenticated bind, which servers accept
        if dn.is_empty() || password.is_empty() {
            return Ok(false);
        }

        let mut ldap = self.create_connection().await?;
        let result = ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| map_ldap_error(e, &self.options.host))?;
        unbound(dn, ldap.unbind().await);

        match result.rc {
            RC_SUCCESS => Ok(true),
            RC_INVALID_CREDENTIALS => Ok(false),
            rc => {
                warn!("Bind for {} rejected with code {}", dn, rc);
                Ok(false)
            }
        }
    }

    async fn root_dse(&self) -> Result<DirectoryEntry> {
        let mut ldap = self.connection().await?;

        let (results, _res) = ldap
            .search("", Scope::Base, "(objectClass=*)", ROOT_DSE_ATTRIBUTES.to_vec())
            .await
            .map_err(|e| map_ldap_error(e, &self.options.host))?
            .success()
            .map_err(|e| Error::Protocol(format!("Root DSE error: {}", e)))?;

        Ok(results
            .into_iter()
            .next()
            .map(|entry| convert_entry(SearchEntry::construct(entry)))
            .unwrap_or_else(|| DirectoryEntry::new("")))
    }
}

/// Opens [`LdapDirectory`] clients
#[derive(Debug, Default, Clone, Copy)]
pub struct LdapConnector;

impl Connector for LdapConnector {
    fn connect(&self, options: &ConnectionOptions) -> Result<Arc<dyn DirectoryClient>> {
        Ok(Arc::new(LdapDirectory::new(options.clone())))
    }
}

fn ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn convert_results(results: Vec<ResultEntry>, keep_referrals: bool) -> SearchResponse {
    let mut response = SearchResponse::default();

    for result in results {
        if result.is_ref() {
            if keep_referrals {
                response.referrals.extend(ldap3::parse_refs(result.0));
            }
            continue;
        }
        response.entries.push(convert_entry(SearchEntry::construct(result)));
    }

    response
}

fn convert_entry(entry: SearchEntry) -> DirectoryEntry {
    let binary = entry
        .bin_attrs
        .into_iter()
        .map(|(name, values)| {
            let values: Vec<String> = values
                .into_iter()
                .map(|v| String::from_utf8_lossy(&v).into_owned())
                .collect();
            (name, values)
        });

    DirectoryEntry::from_parts(entry.dn, entry.attrs.into_iter().chain(binary))
}

/// Whether a password-check connection closed cleanly
///
/// The bind outcome is already known, so a failed unbind is only logged.
fn unbound(dn: &str, result: std::result::Result<(), LdapError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Unbind after password check for {} failed: {}", dn, e);
            false
        }
    }
}

fn map_ldap_error(error: LdapError, server: &str) -> Error {
    match error {
        LdapError::Timeout { .. } => Error::Timeout,
        e @ LdapError::Io { .. } => Error::Connection(format!("{}: {}", server, e)),
        other => Error::Protocol(format!("{}: {}", server, other)),
    }
}
