//! In-memory directory used by the unit tests
//!
//! Evaluates filter trees against fixture entries, computes the `memberOf`
//! back-link on the fly, answers the in-chain matching rule, hands out
//! referrals for configured bases, and records every search it serves.

use crate::client::{ConnectionOptions, Connector, DirectoryClient};
use crate::connection_cache::ConnectionCache;
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::config::DirectoryConfig;
use nestor_core::types::{
    dn_ends_with, dn_eq, normalize_dn, DirectoryEntry, Filter, SearchRequest, SearchResponse, SearchScope,
    DEFAULT_VIRTUAL_MEMBERSHIP_ATTRIBUTE,
};
use nestor_core::{Error, Result, IN_CHAIN_MATCHING_RULE_OID};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub(crate) const BASE: &str = "dc=github,dc=com";

pub(crate) struct MemoryDirectory {
    entries: Vec<DirectoryEntry>,
    root_dse: Option<DirectoryEntry>,
    passwords: HashMap<String, String>,
    referrals: Vec<(String, String)>,
    backlink: String,
    searches: Mutex<Vec<SearchRequest>>,
}

impl MemoryDirectory {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            root_dse: Some(DirectoryEntry::new("")),
            passwords: HashMap::new(),
            referrals: Vec::new(),
            backlink: DEFAULT_VIRTUAL_MEMBERSHIP_ATTRIBUTE.to_string(),
            searches: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_entry(mut self, entry: DirectoryEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub(crate) fn with_root_dse(mut self, root_dse: DirectoryEntry) -> Self {
        self.root_dse = Some(root_dse);
        self
    }

    /// Root DSE reads fail
    pub(crate) fn without_root_dse(mut self) -> Self {
        self.root_dse = None;
        self
    }

    pub(crate) fn with_password(mut self, dn: &str, password: &str) -> Self {
        self.passwords.insert(normalize_dn(dn), password.to_string());
        self
    }

    /// Searches under `base` answer with a referral to `url`
    pub(crate) fn with_referral(mut self, base: &str, url: &str) -> Self {
        self.referrals.push((base.to_string(), url.to_string()));
        self
    }

    pub(crate) fn with_backlink(mut self, attribute: &str) -> Self {
        self.backlink = attribute.to_string();
        self
    }

    /// Grant AD in-chain support by advertising the 2008 R2 capability
    pub(crate) fn active_directory(self) -> Self {
        self.with_root_dse(
            DirectoryEntry::new("").with_attribute("supportedCapabilities", ["1.2.840.113556.1.4.2080"]),
        )
    }

    pub(crate) fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().clone()
    }

    pub(crate) fn search_count(&self) -> usize {
        self.searches.lock().len()
    }

    /// Groups listing `dn` directly
    fn parents(&self, dn: &str) -> Vec<&DirectoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_group() && e.member_dns().iter().any(|m| dn_eq(m, dn)))
            .collect()
    }

    /// Normalized DNs of every group reachable through membership
    fn ancestors(&self, dn: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([dn.to_string()]);

        while let Some(current) = queue.pop_front() {
            for parent in self.parents(&current) {
                if seen.insert(normalize_dn(parent.dn())) {
                    queue.push_back(parent.dn().to_string());
                }
            }
        }
        seen
    }

    fn values(&self, entry: &DirectoryEntry, attribute: &str) -> Vec<String> {
        if attribute.eq_ignore_ascii_case(&self.backlink) && !entry.has(attribute) {
            return self.parents(entry.dn()).iter().map(|p| p.dn().to_string()).collect();
        }
        entry.get(attribute).to_vec()
    }

    fn matches(&self, entry: &DirectoryEntry, filter: &Filter) -> bool {
        match filter {
            Filter::Present(attr) if attr.eq_ignore_ascii_case("objectClass") => true,
            Filter::Present(attr) => !self.values(entry, attr).is_empty(),
            Filter::Equality(attr, value) => self
                .values(entry, attr)
                .iter()
                .any(|v| v.to_lowercase() == value.to_lowercase()),
            Filter::ExtensibleMatch {
                attribute,
                rule,
                value,
            } if rule == IN_CHAIN_MATCHING_RULE_OID && attribute.eq_ignore_ascii_case("memberOf") => {
                self.ancestors(entry.dn()).contains(&normalize_dn(value))
            }
            Filter::ExtensibleMatch { attribute, value, .. } => self
                .values(entry, attribute)
                .iter()
                .any(|v| dn_eq(v, value)),
            Filter::And(children) => children.iter().all(|f| self.matches(entry, f)),
            Filter::Or(children) => children.iter().any(|f| self.matches(entry, f)),
        }
    }

    /// Result copy carrying the derived back-link
    fn decorate(&self, entry: &DirectoryEntry) -> DirectoryEntry {
        if entry.has(&self.backlink) {
            return entry.clone();
        }
        let parents: Vec<String> = self.parents(entry.dn()).iter().map(|p| p.dn().to_string()).collect();
        if parents.is_empty() {
            return entry.clone();
        }
        entry.clone().with_attribute(self.backlink.clone(), parents)
    }
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    let dn = normalize_dn(dn);
    let base = normalize_dn(base);

    match scope {
        SearchScope::Base => dn == base,
        _ if base.is_empty() => true,
        SearchScope::OneLevel => dn
            .split_once(',')
            .map(|(_, parent)| parent == base)
            .unwrap_or(false),
        SearchScope::Subtree => dn == base || dn.ends_with(&format!(",{}", base)),
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.searches.lock().push(request.clone());

        if let Some((_, url)) = self
            .referrals
            .iter()
            .find(|(base, _)| dn_ends_with(&request.base, base))
        {
            if request.return_referrals {
                return Ok(SearchResponse::referral(vec![url.clone()]));
            }
            return Ok(SearchResponse::default());
        }

        let filter = request.filter.clone().unwrap_or_else(Filter::everything);
        let mut entries: Vec<DirectoryEntry> = self
            .entries
            .iter()
            .filter(|e| in_scope(e.dn(), &request.base, request.scope))
            .filter(|e| self.matches(e, &filter))
            .map(|e| self.decorate(e))
            .collect();

        if let Some(limit) = request.size_limit {
            entries.truncate(limit.max(0) as usize);
        }

        Ok(SearchResponse::entries(entries))
    }

    async fn bind(&self, dn: &str, password: &str) -> Result<bool> {
        Ok(!password.is_empty()
            && self
                .passwords
                .get(&normalize_dn(dn))
                .map(|p| p == password)
                .unwrap_or(false))
    }

    async fn root_dse(&self) -> Result<DirectoryEntry> {
        self.root_dse
            .clone()
            .ok_or_else(|| Error::Connection("root DSE unavailable".to_string()))
    }
}

/// Hands out fixture directories by host
pub(crate) struct MemoryConnector {
    hosts: HashMap<String, Arc<MemoryDirectory>>,
    connects: Mutex<Vec<ConnectionOptions>>,
}

impl MemoryConnector {
    pub(crate) fn new() -> Self {
        Self {
            hosts: HashMap::new(),
            connects: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_host(self, host: &str, directory: MemoryDirectory) -> Self {
        self.with_shared_host(host, Arc::new(directory))
    }

    pub(crate) fn with_shared_host(mut self, host: &str, directory: Arc<MemoryDirectory>) -> Self {
        self.hosts.insert(host.to_lowercase(), directory);
        self
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    pub(crate) fn connections(&self) -> Vec<ConnectionOptions> {
        self.connects.lock().clone()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, options: &ConnectionOptions) -> Result<Arc<dyn DirectoryClient>> {
        let directory = self
            .hosts
            .get(&options.host.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::Connection(format!("no such host: {}", options.host)))?;

        self.connects.lock().push(options.clone());
        Ok(directory)
    }
}

fn person(uid: &str) -> DirectoryEntry {
    DirectoryEntry::new(format!("uid={},ou=People,{}", uid, BASE))
        .with_attribute("objectClass", ["top", "person", "inetOrgPerson", "posixAccount"])
        .with_attribute("uid", [uid])
        .with_attribute("cn", [uid])
}

fn group(cn: &str, members: &[&str]) -> DirectoryEntry {
    DirectoryEntry::new(group_dn(cn))
        .with_attribute("objectClass", ["top", "groupOfNames"])
        .with_attribute("cn", [cn])
        .with_attribute("member", members.iter().map(|m| m.to_string()))
}

pub(crate) fn user_dn(uid: &str) -> String {
    format!("uid={},ou=People,{}", uid, BASE)
}

pub(crate) fn group_dn(cn: &str) -> String {
    format!("cn={},ou=Groups,{}", cn, BASE)
}

/// Fixture tree under dc=github,dc=com
///
/// ghe-admins -> ghe-users -> user1; nested-group3 -> nested-group2 ->
/// nested-group1 -> user1; cycle-a <-> cycle-b; posix-group1 lists user1
/// by uid; combined-group lists calavera and user1 by uid plus user1 and
/// user2 by DN.
pub(crate) fn github_directory() -> MemoryDirectory {
    let mut directory = MemoryDirectory::new()
        .with_entry(DirectoryEntry::new(BASE).with_attribute("objectClass", ["top", "domain"]))
        .with_entry(DirectoryEntry::new(format!("ou=People,{}", BASE)).with_attribute("objectClass", ["organizationalUnit"]))
        .with_entry(DirectoryEntry::new(format!("ou=Groups,{}", BASE)).with_attribute("objectClass", ["organizationalUnit"]));

    for uid in ["user1", "user2", "admin1", "groupless-user1", "calavera", "alice", "adam"] {
        directory = directory.with_entry(person(uid));
    }

    directory
        .with_password(&user_dn("user1"), "passworD1")
        .with_entry(group("ghe-users", &[&user_dn("user1")]))
        .with_entry(group("ghe-admins", &[&group_dn("ghe-users"), &user_dn("admin1")]))
        .with_entry(group("nested-group1", &[&user_dn("user1")]))
        .with_entry(group("nested-group2", &[&group_dn("nested-group1")]))
        .with_entry(group("nested-group3", &[&group_dn("nested-group2")]))
        .with_entry(group("cycle-a", &[&group_dn("cycle-b"), &user_dn("user2")]))
        .with_entry(group("cycle-b", &[&group_dn("cycle-a"), &user_dn("admin1")]))
        .with_entry(group("dangling", &[&user_dn("user1"), &user_dn("deleted-user")]))
        .with_entry(group("empty-group", &[]))
        .with_entry(
            DirectoryEntry::new(group_dn("posix-group1"))
                .with_attribute("objectClass", ["top", "posixGroup"])
                .with_attribute("cn", ["posix-group1"])
                .with_attribute("gidNumber", ["1001"])
                .with_attribute("memberUid", ["user1"]),
        )
        .with_entry(
            DirectoryEntry::new(group_dn("combined-group"))
                .with_attribute("objectClass", ["top", "posixGroup", "extensibleObject"])
                .with_attribute("cn", ["combined-group"])
                .with_attribute("gidNumber", ["1002"])
                .with_attribute("memberUid", ["calavera", "user1"])
                .with_attribute("member", [user_dn("user1"), user_dn("user2")]),
        )
}

pub(crate) fn github_config() -> DirectoryConfig {
    DirectoryConfig {
        host: "ldap.github.com".to_string(),
        admin_user: format!("uid=admin,{}", BASE),
        admin_password: "passworD1".to_string(),
        uid: "uid".to_string(),
        search_domains: vec![BASE.to_string()],
        ..Default::default()
    }
}

/// Session over `directory` with an isolated, empty connection cache
pub(crate) fn session_for(directory: Arc<MemoryDirectory>, config: DirectoryConfig) -> LdapSession {
    session_with_connector(directory, config, Arc::new(MemoryConnector::new()))
}

pub(crate) fn session_with_connector(
    directory: Arc<MemoryDirectory>,
    config: DirectoryConfig,
    connector: Arc<MemoryConnector>,
) -> LdapSession {
    LdapSession::with_client(config, directory, Arc::new(ConnectionCache::new(connector)))
}

/// Fixture entry as the directory returns it
pub(crate) async fn lookup(directory: &MemoryDirectory, dn: &str) -> DirectoryEntry {
    directory
        .search(&SearchRequest::base_object(dn))
        .await
        .unwrap()
        .entries
        .into_iter()
        .next()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter;

    #[tokio::test]
    async fn test_backlink_is_computed() {
        let directory = github_directory();
        let user = lookup(&directory, &user_dn("user1")).await;

        let groups: Vec<String> = user.get("memberOf").iter().map(|g| normalize_dn(g)).collect();
        assert!(groups.contains(&normalize_dn(&group_dn("ghe-users"))));
        assert!(!groups.contains(&normalize_dn(&group_dn("ghe-admins"))));
    }

    #[tokio::test]
    async fn test_in_chain_rule() {
        let directory = github_directory();
        let request = SearchRequest::new(BASE, filter::in_chain_filter(&group_dn("ghe-admins")));
        let response = directory.search(&request).await.unwrap();

        let dns: Vec<&str> = response.entries.iter().map(|e| e.dn()).collect();
        assert!(dns.contains(&user_dn("user1").as_str()));
        assert!(dns.contains(&group_dn("ghe-users").as_str()));
        assert!(dns.contains(&user_dn("admin1").as_str()));
    }

    #[tokio::test]
    async fn test_scopes() {
        assert!(in_scope(&user_dn("user1"), BASE, SearchScope::Subtree));
        assert!(!in_scope(&user_dn("user1"), BASE, SearchScope::OneLevel));
        assert!(in_scope(&user_dn("user1"), &format!("ou=People,{}", BASE), SearchScope::OneLevel));
        assert!(!in_scope(&user_dn("user1"), BASE, SearchScope::Base));
        assert!(in_scope(&user_dn("user1"), "", SearchScope::Subtree));
    }

    #[tokio::test]
    async fn test_missing_base_object_is_empty() {
        let directory = github_directory();
        let response = directory
            .search(&SearchRequest::base_object(user_dn("deleted-user")))
            .await
            .unwrap();
        assert!(response.entries.is_empty());
    }
}
