//! Direct membership only; nested subgroups are not followed

use super::{Membership, ValidateMembership};
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::types::DirectoryEntry;
use nestor_core::Result;
use tracing::debug;

pub struct ClassicValidator {
    session: LdapSession,
}

impl ClassicValidator {
    pub fn new(session: LdapSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ValidateMembership for ClassicValidator {
    async fn perform(&self, entry: &DirectoryEntry, groups: &[DirectoryEntry]) -> Result<Membership> {
        if groups.is_empty() {
            return Ok(Membership::unrestricted());
        }

        let names: Vec<&str> = groups.iter().filter_map(|g| g.first("cn")).collect();

        for domain in self.session.search_domains() {
            let membership = domain.membership(entry, &names).await?;
            if !membership.is_empty() {
                debug!("{} is a direct member under {}", entry.dn(), domain.base());
                return Ok(Membership::granted(membership));
            }
        }

        Ok(Membership::denied())
    }
}
