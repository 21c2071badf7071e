//! Member enumeration with a single in-chain query per domain

use super::{attributes, SearchMembers};
use crate::filter::in_chain_filter;
use crate::group::dedup_by_dn;
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::types::{DirectoryEntry, SearchRequest};
use nestor_core::Result;

pub struct ActiveDirectoryMemberSearch {
    session: LdapSession,
    attributes: Vec<String>,
}

impl ActiveDirectoryMemberSearch {
    pub fn new(session: LdapSession) -> Self {
        Self {
            session,
            attributes: attributes(&[]),
        }
    }

    pub fn with_attributes(mut self, extra: &[String]) -> Self {
        self.attributes = attributes(extra);
        self
    }
}

#[async_trait]
impl SearchMembers for ActiveDirectoryMemberSearch {
    async fn perform(&self, group: &DirectoryEntry) -> Result<Vec<DirectoryEntry>> {
        let filter = in_chain_filter(group.dn());

        let mut entries = Vec::new();
        for domain in self.session.search_domains() {
            let request = SearchRequest::new(domain.base(), filter.clone()).attributes(self.attributes.iter().cloned());
            entries.extend(domain.search(request).await?);
        }

        Ok(dedup_by_dn(entries))
    }
}
