//! Server-side ancestry match with the in-chain matching rule

use super::{Membership, ValidateMembership};
use crate::filter::membership_in_chain_filter;
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::types::{DirectoryEntry, SearchRequest, SearchScope};
use nestor_core::Result;
use tracing::debug;

pub struct ActiveDirectoryValidator {
    session: LdapSession,
}

impl ActiveDirectoryValidator {
    pub fn new(session: LdapSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ValidateMembership for ActiveDirectoryValidator {
    async fn perform(&self, entry: &DirectoryEntry, groups: &[DirectoryEntry]) -> Result<Membership> {
        let group_dns: Vec<&str> = groups.iter().map(DirectoryEntry::dn).collect();
        let Some(filter) = membership_in_chain_filter(&group_dns) else {
            return Ok(Membership::unrestricted());
        };

        // The entry matches itself only if it is a transitive member
        let request = SearchRequest::new(entry.dn(), filter)
            .scope(SearchScope::Base)
            .attributes(["1.1"])
            .return_referrals(true);

        let results = self.session.referral_chaser().search(&request).await?;
        let is_member = results.iter().any(|r| r.dn_matches(entry.dn()));
        debug!("In-chain check for {}: {}", entry.dn(), is_member);

        Ok(Membership {
            is_member,
            groups: Vec::new(),
        })
    }
}
