//! Membership through a server-maintained back-link attribute
//!
//! Level 0 is read straight off the entry's back-link values. Deeper
//! levels walk down from the candidate groups, asking for the subgroups
//! whose back-link names the previous level, until one of them shows up
//! among the entry's own back-links.

use super::{group_dns, matching_groups, Membership, ValidateMembership};
use crate::filter::subgroups_of_group;
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::types::{normalize_dn, DirectoryEntry, Filter};
use nestor_core::Result;
use std::collections::HashSet;
use tracing::debug;

pub struct VirtualAttributesValidator {
    session: LdapSession,
    depth: usize,
}

impl VirtualAttributesValidator {
    pub fn new(session: LdapSession) -> Self {
        let depth = session.max_depth();
        Self { session, depth }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }
}

#[async_trait]
impl ValidateMembership for VirtualAttributesValidator {
    async fn perform(&self, entry: &DirectoryEntry, groups: &[DirectoryEntry]) -> Result<Membership> {
        if groups.is_empty() {
            return Ok(Membership::unrestricted());
        }

        let attribute = self.session.virtual_membership();
        let backlinks = entry.get(attribute);

        let matched = matching_groups(groups, backlinks.iter().map(String::as_str));
        if !matched.is_empty() {
            return Ok(Membership::granted(matched));
        }
        if backlinks.is_empty() {
            return Ok(Membership::denied());
        }

        let direct: HashSet<String> = backlinks.iter().map(|dn| normalize_dn(dn)).collect();
        let candidates = group_dns(groups);

        for domain in self.session.search_domains() {
            let mut level: Vec<String> = groups.iter().map(|g| g.dn().to_string()).collect();

            for depth in 0..self.depth {
                let Some(filter) = Filter::any(level.iter().map(|dn| subgroups_of_group(dn, attribute))) else {
                    break;
                };

                level = domain
                    .find(filter, &["1.1"])
                    .await?
                    .into_iter()
                    .map(|g| g.dn().to_string())
                    .filter(|dn| !candidates.contains(&normalize_dn(dn)))
                    .collect();
                debug!("Level {} under {}: {} subgroups", depth + 1, domain.base(), level.len());

                if level.iter().any(|dn| direct.contains(&normalize_dn(dn))) {
                    return Ok(Membership::granted(Vec::new()));
                }
            }
        }

        Ok(Membership::denied())
    }
}
