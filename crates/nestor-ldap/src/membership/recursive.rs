//! Nested membership by widening over group DNs one level at a time
//!
//! Level 0 is the set of groups the entry belongs to directly. Each
//! further level asks for the groups that list any DN of the previous
//! level. The walk is bounded by depth only; a cycle costs at most the
//! remaining levels.

use super::{group_dns, matching_groups, Membership, ValidateMembership};
use crate::domain::Domain;
use crate::filter::{member_filter, posix_member_filter};
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::types::{normalize_dn, DirectoryEntry, Filter};
use nestor_core::Result;
use std::collections::HashSet;
use tracing::debug;

/// Request no attributes, DNs only
const DN_ONLY: [&str; 1] = ["1.1"];

pub struct RecursiveValidator {
    session: LdapSession,
    depth: usize,
}

impl RecursiveValidator {
    pub fn new(session: LdapSession) -> Self {
        let depth = session.max_depth();
        Self { session, depth }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    async fn direct_groups(&self, domain: &Domain, entry: &DirectoryEntry) -> Result<Vec<String>> {
        let mut filter = member_filter(Some(entry.dn()));
        if self.session.posix_support_enabled() {
            if let Some(posix) = posix_member_filter(entry, self.session.uid()) {
                filter = filter | posix;
            }
        }

        Ok(unique_dns(domain.find(filter, &DN_ONLY).await?))
    }

    /// Groups listing any DN of `level`
    async fn parent_groups(&self, domain: &Domain, level: &[String]) -> Result<Vec<String>> {
        let Some(filter) = Filter::any(level.iter().map(|dn| member_filter(Some(dn.as_str())))) else {
            return Ok(Vec::new());
        };

        Ok(unique_dns(domain.find(filter, &DN_ONLY).await?))
    }
}

#[async_trait]
impl ValidateMembership for RecursiveValidator {
    async fn perform(&self, entry: &DirectoryEntry, groups: &[DirectoryEntry]) -> Result<Membership> {
        if groups.is_empty() {
            return Ok(Membership::unrestricted());
        }

        let candidates = group_dns(groups);
        let hit = |level: &[String]| level.iter().any(|dn| candidates.contains(&normalize_dn(dn)));

        for domain in self.session.search_domains() {
            let mut membership = self.direct_groups(&domain, entry).await?;

            if hit(&membership) {
                return Ok(Membership::granted(matching_groups(
                    groups,
                    membership.iter().map(String::as_str),
                )));
            }

            for depth in 0..self.depth {
                if membership.is_empty() {
                    break;
                }

                membership = self.parent_groups(&domain, &membership).await?;
                debug!("Level {} under {}: {} groups", depth + 1, domain.base(), membership.len());

                if hit(&membership) {
                    return Ok(Membership::granted(matching_groups(
                        groups,
                        membership.iter().map(String::as_str),
                    )));
                }
            }
        }

        Ok(Membership::denied())
    }
}

fn unique_dns(entries: Vec<DirectoryEntry>) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .map(|e| e.dn().to_string())
        .filter(|dn| seen.insert(normalize_dn(dn)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member_search::{MemberSearch, SearchMembers};
    use crate::strategy::MemberSearchKind;
    use crate::testing::{github_config, github_directory, group_dn, lookup, session_for, user_dn, MemoryDirectory};
    use nestor_core::config::DirectoryConfig;
    use std::sync::Arc;

    fn validator(directory: &Arc<MemoryDirectory>, depth: usize) -> RecursiveValidator {
        RecursiveValidator::new(session_for(directory.clone(), github_config())).with_depth(depth)
    }

    #[tokio::test]
    async fn test_nested_membership_needs_depth() {
        let directory = Arc::new(github_directory());
        let user1 = lookup(&directory, &user_dn("user1")).await;
        let admins = vec![lookup(&directory, &group_dn("ghe-admins")).await];

        assert!(!validator(&directory, 0).perform(&user1, &admins).await.unwrap().is_member);

        let membership = validator(&directory, 1).perform(&user1, &admins).await.unwrap();
        assert!(membership.is_member);
        assert!(membership.groups[0].dn_matches(&group_dn("ghe-admins")));
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let directory = Arc::new(github_directory());
        let user1 = lookup(&directory, &user_dn("user1")).await;
        let outer = vec![lookup(&directory, &group_dn("nested-group3")).await];

        assert!(!validator(&directory, 1).perform(&user1, &outer).await.unwrap().is_member);
        assert!(validator(&directory, 2).perform(&user1, &outer).await.unwrap().is_member);
    }

    #[tokio::test]
    async fn test_default_depth() {
        let directory = Arc::new(github_directory());
        let validator = RecursiveValidator::new(session_for(directory.clone(), github_config()));
        assert_eq!(validator.depth, 9);
    }

    #[tokio::test]
    async fn test_cyclic_groups_terminate() {
        let directory = Arc::new(github_directory());
        let user2 = lookup(&directory, &user_dn("user2")).await;
        let unrelated = vec![lookup(&directory, &group_dn("ghe-admins")).await];

        let before = directory.search_count();
        let membership = validator(&directory, 9).perform(&user2, &unrelated).await.unwrap();
        assert!(!membership.is_member);

        // level 0 plus at most one search per level
        assert!(directory.search_count() - before <= 10);

        let cycle = vec![lookup(&directory, &group_dn("cycle-b")).await];
        assert!(validator(&directory, 9).perform(&user2, &cycle).await.unwrap().is_member);
    }

    #[tokio::test]
    async fn test_posix_membership_at_level_zero() {
        let directory = Arc::new(github_directory());
        let user1 = lookup(&directory, &user_dn("user1")).await;
        let posix = vec![lookup(&directory, &group_dn("posix-group1")).await];

        assert!(validator(&directory, 0).perform(&user1, &posix).await.unwrap().is_member);

        let config = DirectoryConfig {
            posix_support: false,
            ..github_config()
        };
        let disabled = RecursiveValidator::new(session_for(directory.clone(), config));
        assert!(!disabled.perform(&user1, &posix).await.unwrap().is_member);
    }

    #[tokio::test]
    async fn test_agrees_with_recursive_member_search() {
        let directory = Arc::new(github_directory());
        let session = session_for(directory.clone(), github_config());
        let search = MemberSearch::new(MemberSearchKind::Recursive, session.clone());

        for cn in ["ghe-admins", "nested-group3", "cycle-a", "combined-group"] {
            let group = lookup(&directory, &group_dn(cn)).await;
            for member in search.perform(&group).await.unwrap() {
                let membership = RecursiveValidator::new(session.clone())
                    .perform(&member, std::slice::from_ref(&group))
                    .await
                    .unwrap();
                assert!(membership.is_member, "{} not validated in {}", member.dn(), cn);
            }
        }
    }
}
