//! Directory session
//!
//! A session owns one base connection and everything derived from it:
//! memoized capabilities, the optional forest fan-out, and the strategy
//! kinds pinned on first use. Sessions are cheap to clone and share their
//! state; two sessions built separately share nothing unless they were
//! handed the same [`ConnectionCache`].

use crate::capabilities::Capabilities;
use crate::client::{ConnectionOptions, Connector, DirectoryClient};
use crate::connection_cache::ConnectionCache;
use crate::domain::Domain;
use crate::forest::ForestSearch;
use crate::group::Group;
use crate::member_search::MemberSearch;
use crate::membership::MembershipValidator;
use crate::referral::ReferralChaser;
use crate::strategy::{self, MemberSearchKind, ValidatorKind};
use crate::user_search::UserSearch;
use nestor_core::config::DirectoryConfig;
use nestor_core::types::{DirectoryEntry, Filter, SearchRequest};
use nestor_core::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[derive(Clone)]
pub struct LdapSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: DirectoryConfig,
    options: ConnectionOptions,
    /// Direct connection to the configured server
    connection: Arc<dyn DirectoryClient>,
    /// Where searches go: the forest fan-out when enabled, else `connection`
    client: Arc<dyn DirectoryClient>,
    connections: Arc<ConnectionCache>,
    capabilities: Arc<Capabilities>,
    validator: OnceCell<ValidatorKind>,
    member_search: OnceCell<MemberSearchKind>,
    user_search: OnceCell<UserSearch>,
}

impl LdapSession {
    /// Connect to the configured server through `connector`
    pub fn new(config: DirectoryConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;

        let connections = Arc::new(ConnectionCache::new(connector));
        let connection = connections.get_connection(&ConnectionOptions::from_config(&config))?;

        Ok(Self::with_client(config, connection, connections))
    }

    /// Build a session over an existing client and connection cache
    pub fn with_client(
        config: DirectoryConfig,
        connection: Arc<dyn DirectoryClient>,
        connections: Arc<ConnectionCache>,
    ) -> Self {
        let options = ConnectionOptions::from_config(&config);
        let capabilities = Arc::new(Capabilities::new(
            connection.clone(),
            config.active_directory_capability_oids.clone(),
        ));

        let client: Arc<dyn DirectoryClient> = if config.search_forest {
            Arc::new(ForestSearch::new(
                connection.clone(),
                capabilities.clone(),
                connections.clone(),
                options.clone(),
            ))
        } else {
            connection.clone()
        };

        Self {
            inner: Arc::new(SessionInner {
                config,
                options,
                connection,
                client,
                connections,
                capabilities,
                validator: OnceCell::new(),
                member_search: OnceCell::new(),
                user_search: OnceCell::new(),
            }),
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.inner.config
    }

    pub fn connection_options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    /// Client searches are routed through
    pub fn client(&self) -> Arc<dyn DirectoryClient> {
        self.inner.client.clone()
    }

    pub fn connections(&self) -> &Arc<ConnectionCache> {
        &self.inner.connections
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }

    pub async fn active_directory_capable(&self) -> bool {
        self.inner.capabilities.active_directory_capable().await
    }

    /// Bind as the service account
    pub async fn test_connection(&self) -> Result<bool> {
        let options = &self.inner.options;
        self.inner
            .connection
            .bind(&options.admin_user, &options.admin_password)
            .await
    }

    pub async fn search_root_dse(&self) -> DirectoryEntry {
        self.inner.capabilities.root_dse().await.clone()
    }

    /// Entries matching `request`; referrals are not followed here
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        let response = self.inner.client.search(request).await?;
        if response.is_referral() {
            debug!("Search of {} returned referrals {:?}", request.base, response.referrals);
        }
        Ok(response.entries)
    }

    /// Run `filter` under every search domain and concatenate the results
    pub async fn search_in_domains(&self, filter: &Filter, attributes: &[&str]) -> Result<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();
        for domain in self.search_domains() {
            entries.extend(domain.find(filter.clone(), attributes).await?);
        }
        Ok(entries)
    }

    pub fn domain(&self, base: impl Into<String>) -> Domain {
        Domain::new(base, self.clone())
    }

    pub fn search_domains(&self) -> Vec<Domain> {
        self.inner
            .config
            .search_domains
            .iter()
            .map(|base| self.domain(base.clone()))
            .collect()
    }

    pub fn uid(&self) -> &str {
        &self.inner.config.uid
    }

    pub fn posix_support_enabled(&self) -> bool {
        self.inner.config.posix_support
    }

    pub fn virtual_attributes_enabled(&self) -> bool {
        self.inner.config.virtual_attributes.enabled()
    }

    /// Back-link attribute name
    pub fn virtual_membership(&self) -> &str {
        self.inner.config.virtual_attributes.virtual_membership()
    }

    pub fn max_depth(&self) -> usize {
        self.inner.config.max_depth
    }

    /// Validator kind, pinned for the session on first call
    pub async fn validator_kind(&self) -> ValidatorKind {
        *self
            .inner
            .validator
            .get_or_init(|| async {
                let config = &self.inner.config;
                let kind = strategy::select(
                    config.membership_validator.as_deref(),
                    config.recursive_group_search_fallback,
                    &self.inner.capabilities,
                )
                .await;
                info!("Membership validator: {}", kind);
                kind
            })
            .await
    }

    /// Member search kind, pinned for the session on first call
    pub async fn member_search_kind(&self) -> MemberSearchKind {
        *self
            .inner
            .member_search
            .get_or_init(|| async {
                let config = &self.inner.config;
                let kind = strategy::select(
                    config.member_search_strategy.as_deref(),
                    config.recursive_group_search_fallback,
                    &self.inner.capabilities,
                )
                .await;
                info!("Member search strategy: {}", kind);
                kind
            })
            .await
    }

    pub async fn membership_validator(&self) -> MembershipValidator {
        MembershipValidator::new(self.validator_kind().await, self.clone())
    }

    pub async fn member_search(&self) -> MemberSearch {
        MemberSearch::new(self.member_search_kind().await, self.clone())
    }

    pub async fn user_search(&self) -> UserSearch {
        *self
            .inner
            .user_search
            .get_or_init(|| async {
                if self.inner.config.search_forest && self.active_directory_capable().await {
                    UserSearch::ActiveDirectory
                } else {
                    UserSearch::Default
                }
            })
            .await
    }

    pub fn load_group(&self, entry: DirectoryEntry) -> Group {
        Group::load(self.clone(), entry)
    }

    /// Referral chaser over the routed client
    pub fn referral_chaser(&self) -> ReferralChaser {
        ReferralChaser::new(
            self.client(),
            self.inner.connections.clone(),
            self.inner.options.clone(),
        )
    }
}
