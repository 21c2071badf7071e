//! Member enumeration by widening over member DNs one level at a time
//!
//! Each member DN is read once with a base-scoped group query. Groups come
//! back as full entries and their members feed the next level; anything
//! else is kept as a DN-only entry. POSIX groups without DN members are
//! answered directly from their uid list. DNs still queued when the depth
//! bound is reached are returned unread.

use super::{attributes, SearchMembers};
use crate::filter::all_groups_filter;
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::types::{normalize_dn, DirectoryEntry, Filter, SearchRequest};
use nestor_core::Result;
use std::collections::HashSet;
use tracing::debug;

pub struct RecursiveMemberSearch {
    session: LdapSession,
    depth: usize,
    attributes: Vec<String>,
}

/// Entries emitted so far, in discovery order
#[derive(Default)]
struct Found {
    entries: Vec<DirectoryEntry>,
    dns: HashSet<String>,
}

impl Found {
    fn contains(&self, dn: &str) -> bool {
        self.dns.contains(&normalize_dn(dn))
    }

    fn insert(&mut self, entry: DirectoryEntry) {
        if self.dns.insert(normalize_dn(entry.dn())) {
            self.entries.push(entry);
        }
    }
}

impl RecursiveMemberSearch {
    pub fn new(session: LdapSession) -> Self {
        let depth = session.max_depth();
        Self {
            session,
            depth,
            attributes: attributes(&[]),
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_attributes(mut self, extra: &[String]) -> Self {
        self.attributes = attributes(extra);
        self
    }

    /// Entries whose login attribute is one of `uids`
    async fn entries_by_uid(&self, uids: &[String]) -> Result<Vec<DirectoryEntry>> {
        let uid = self.session.uid();
        let Some(filter) = Filter::any(uids.iter().map(|u| Filter::eq(uid, u.as_str()))) else {
            return Ok(Vec::new());
        };

        let attributes: Vec<&str> = self.attributes.iter().map(String::as_str).collect();
        self.session.search_in_domains(&filter, &attributes).await
    }

    /// Group entries at `dn`, empty when it is not a group
    async fn group_at(&self, dn: &str) -> Result<Vec<DirectoryEntry>> {
        let request = SearchRequest::base_object(dn)
            .filter(all_groups_filter())
            .attributes(self.attributes.iter().cloned());
        self.session.search(&request).await
    }
}

#[async_trait]
impl SearchMembers for RecursiveMemberSearch {
    async fn perform(&self, group: &DirectoryEntry) -> Result<Vec<DirectoryEntry>> {
        let uids: &[String] = if self.session.posix_support_enabled() {
            group.member_uids()
        } else {
            &[]
        };
        if !uids.is_empty() && !group.has_dn_members() {
            return self.entries_by_uid(uids).await;
        }

        let mut found = Found::default();
        for entry in self.entries_by_uid(uids).await? {
            found.insert(entry);
        }

        let mut searched = HashSet::from([normalize_dn(group.dn())]);
        let mut level: Vec<String> = group.member_dns().into_iter().map(String::from).collect();

        for depth in 0..self.depth {
            if level.is_empty() {
                break;
            }

            let mut next = Vec::new();
            for dn in level {
                if found.contains(&dn) || !searched.insert(normalize_dn(&dn)) {
                    continue;
                }

                let groups = self.group_at(&dn).await?;
                if groups.is_empty() {
                    found.insert(DirectoryEntry::new(dn));
                    continue;
                }

                for subgroup in groups {
                    next.extend(subgroup.member_dns().into_iter().map(String::from));
                    found.insert(subgroup);
                }
            }

            debug!("Level {} of {}: {} member DNs queued", depth + 1, group.dn(), next.len());
            level = next;
        }

        // Past the depth bound members are reported without being read
        for dn in level {
            if !found.contains(&dn) && !searched.contains(&normalize_dn(&dn)) {
                found.insert(DirectoryEntry::new(dn));
            }
        }

        Ok(found.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{github_config, github_directory, group_dn, lookup, session_for, user_dn, MemoryDirectory};
    use std::sync::Arc;

    fn search(directory: &Arc<MemoryDirectory>) -> RecursiveMemberSearch {
        RecursiveMemberSearch::new(session_for(directory.clone(), github_config()))
    }

    fn sorted(entries: &[DirectoryEntry]) -> Vec<String> {
        let mut dns: Vec<String> = entries.iter().map(|e| normalize_dn(e.dn())).collect();
        dns.sort();
        dns
    }

    fn expected(dns: &[String]) -> Vec<String> {
        let mut dns: Vec<String> = dns.iter().map(|d| normalize_dn(d)).collect();
        dns.sort();
        dns
    }

    #[tokio::test]
    async fn test_nested_members() {
        let directory = Arc::new(github_directory());
        let group = lookup(&directory, &group_dn("nested-group3")).await;

        let found = search(&directory).perform(&group).await.unwrap();
        assert_eq!(
            sorted(&found),
            expected(&[group_dn("nested-group2"), group_dn("nested-group1"), user_dn("user1")])
        );

        // non-group members come back as DN-only entries
        let user1 = found.iter().find(|e| e.dn_matches(&user_dn("user1"))).unwrap();
        assert_eq!(user1.attribute_names().count(), 0);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let directory = Arc::new(github_directory());
        let group = lookup(&directory, &group_dn("nested-group3")).await;

        let found = search(&directory).with_depth(1).perform(&group).await.unwrap();
        assert_eq!(
            sorted(&found),
            expected(&[group_dn("nested-group2"), group_dn("nested-group1")])
        );

        let found = search(&directory).with_depth(2).perform(&group).await.unwrap();
        assert_eq!(
            sorted(&found),
            expected(&[group_dn("nested-group2"), group_dn("nested-group1"), user_dn("user1")])
        );
    }

    #[tokio::test]
    async fn test_zero_depth_lists_direct_members() {
        let directory = Arc::new(github_directory());
        let group = lookup(&directory, &group_dn("ghe-admins")).await;

        let before = directory.search_count();
        let found = search(&directory).with_depth(0).perform(&group).await.unwrap();

        assert_eq!(directory.search_count(), before);
        assert_eq!(sorted(&found), expected(&[group_dn("ghe-users"), user_dn("admin1")]));
        assert!(found.iter().all(|e| e.attribute_names().count() == 0));
    }

    #[tokio::test]
    async fn test_cycle_excludes_the_group_itself() {
        let directory = Arc::new(github_directory());
        let group = lookup(&directory, &group_dn("cycle-a")).await;

        let found = search(&directory).perform(&group).await.unwrap();
        assert_eq!(
            sorted(&found),
            expected(&[group_dn("cycle-b"), user_dn("user2"), user_dn("admin1")])
        );
    }

    #[tokio::test]
    async fn test_each_dn_is_searched_once() {
        let directory = Arc::new(github_directory());
        let group = lookup(&directory, &group_dn("ghe-admins")).await;

        let before = directory.search_count();
        search(&directory).perform(&group).await.unwrap();

        // ghe-users, admin1, user1
        assert_eq!(directory.search_count() - before, 3);
    }

    #[tokio::test]
    async fn test_posix_group_short_circuits() {
        let directory = Arc::new(github_directory());
        let group = lookup(&directory, &group_dn("posix-group1")).await;

        let before = directory.search_count();
        let found = search(&directory).perform(&group).await.unwrap();
        assert_eq!(directory.search_count() - before, 1);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first("uid"), Some("user1"));
    }

    #[tokio::test]
    async fn test_combined_group() {
        let directory = Arc::new(github_directory());
        let group = lookup(&directory, &group_dn("combined-group")).await;

        let found = search(&directory).perform(&group).await.unwrap();
        assert_eq!(
            sorted(&found),
            expected(&[user_dn("user1"), user_dn("user2"), user_dn("calavera")])
        );
    }
}
