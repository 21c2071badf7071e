//! Member enumeration through the client-side group walk

use super::SearchMembers;
use crate::group::dedup_by_dn;
use crate::session::LdapSession;
use async_trait::async_trait;
use nestor_core::types::DirectoryEntry;
use nestor_core::Result;

pub struct ClassicMemberSearch {
    session: LdapSession,
}

impl ClassicMemberSearch {
    pub fn new(session: LdapSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SearchMembers for ClassicMemberSearch {
    /// Nested members followed by nested subgroups
    async fn perform(&self, group: &DirectoryEntry) -> Result<Vec<DirectoryEntry>> {
        let group = self.session.load_group(group.clone());

        let mut entries = group.members().await?;
        entries.extend(group.subgroups().await?);
        Ok(dedup_by_dn(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{github_config, github_directory, group_dn, lookup, session_for, user_dn};
    use nestor_core::types::normalize_dn;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_members_and_subgroups() {
        let directory = Arc::new(github_directory());
        let search = ClassicMemberSearch::new(session_for(directory.clone(), github_config()));
        let group = lookup(&directory, &group_dn("cycle-a")).await;

        let mut found: Vec<String> = search
            .perform(&group)
            .await
            .unwrap()
            .iter()
            .map(|e| normalize_dn(e.dn()))
            .collect();
        found.sort();

        let mut expected = vec![
            normalize_dn(&user_dn("user2")),
            normalize_dn(&user_dn("admin1")),
            normalize_dn(&group_dn("cycle-b")),
        ];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn test_posix_group() {
        let directory = Arc::new(github_directory());
        let search = ClassicMemberSearch::new(session_for(directory.clone(), github_config()));
        let group = lookup(&directory, &group_dn("posix-group1")).await;

        let found = search.perform(&group).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].dn_matches(&user_dn("user1")));
    }
}
