//! Group graph traversal
//!
//! Classic groups list members by DN and may nest without limit, so the
//! walk keeps a visited set and never expands a group twice. POSIX groups
//! add members listed by uid; a combined group contributes both kinds.
//! Virtual groups leave the walk to the server and query the back-link.

use crate::filter::{members_of_group, subgroups_of_group};
use crate::session::LdapSession;
use nestor_core::types::{dn_eq, normalize_dn, DirectoryEntry, Filter, SearchRequest};
use nestor_core::Result;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Classic,
    Posix,
    Virtual,
}

#[derive(Clone)]
pub struct Group {
    session: LdapSession,
    entry: DirectoryEntry,
    kind: GroupKind,
}

impl Group {
    pub(crate) fn load(session: LdapSession, entry: DirectoryEntry) -> Self {
        let kind = if session.virtual_attributes_enabled() {
            GroupKind::Virtual
        } else {
            traversal_kind(&session, &entry)
        };

        Self { session, entry, kind }
    }

    fn child(&self, entry: DirectoryEntry) -> Group {
        Group {
            kind: traversal_kind(&self.session, &entry),
            session: self.session.clone(),
            entry,
        }
    }

    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    pub fn dn(&self) -> &str {
        self.entry.dn()
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Direct DN members resolved to full entries
    ///
    /// DNs that no longer resolve are skipped.
    pub async fn member_entries(&self) -> Result<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();

        for dn in self.entry.member_dns() {
            let found = self.session.search(&SearchRequest::base_object(dn)).await?;
            match found.into_iter().next() {
                Some(entry) => entries.push(entry),
                None => debug!("Skipping unresolvable member {} of {}", dn, self.dn()),
            }
        }

        Ok(entries)
    }

    /// Direct DN members split into (groups, non-groups)
    pub async fn groups_and_members(&self) -> Result<(Vec<DirectoryEntry>, Vec<DirectoryEntry>)> {
        Ok(self
            .member_entries()
            .await?
            .into_iter()
            .partition(DirectoryEntry::is_group))
    }

    /// Entries whose login attribute is listed under `memberUid`
    pub async fn uid_members(&self) -> Result<Vec<DirectoryEntry>> {
        let uid = self.session.uid();
        let Some(filter) = Filter::any(
            self.entry
                .member_uids()
                .iter()
                .map(|member| Filter::eq(uid, member.as_str())),
        ) else {
            return Ok(Vec::new());
        };

        self.session.search_in_domains(&filter, &[]).await
    }

    /// Every member reachable through nested subgroups, deduplicated by DN
    pub async fn members(&self) -> Result<Vec<DirectoryEntry>> {
        match self.kind {
            GroupKind::Virtual => {
                let filter = members_of_group(self.dn(), self.session.virtual_membership());
                self.session.search_in_domains(&filter, &[]).await
            }
            _ => Ok(self.walk().await?.1),
        }
    }

    /// Every nested subgroup, excluding this group
    pub async fn subgroups(&self) -> Result<Vec<DirectoryEntry>> {
        match self.kind {
            GroupKind::Virtual => {
                let filter = subgroups_of_group(self.dn(), self.session.virtual_membership());
                self.session.search_in_domains(&filter, &[]).await
            }
            _ => Ok(self.walk().await?.0),
        }
    }

    pub async fn is_member(&self, entry: &DirectoryEntry) -> Result<bool> {
        match self.kind {
            GroupKind::Posix => {
                let uids = entry.get(self.session.uid());
                let listed = self
                    .entry
                    .member_uids()
                    .iter()
                    .any(|member| uids.contains(member));
                if listed {
                    return Ok(true);
                }
            }
            GroupKind::Virtual => {
                let backlinks = entry.get(self.session.virtual_membership());
                if backlinks.iter().any(|dn| dn_eq(dn, self.dn())) {
                    return Ok(true);
                }
            }
            GroupKind::Classic => {}
        }

        Ok(self
            .members()
            .await?
            .iter()
            .any(|member| member.dn_matches(entry.dn())))
    }

    /// Direct (subgroups, members) of this node
    async fn direct(&self) -> Result<(Vec<DirectoryEntry>, Vec<DirectoryEntry>)> {
        if self.kind != GroupKind::Posix {
            return self.groups_and_members().await;
        }

        let mut members = self.uid_members().await?;
        if !self.entry.is_combined_group() {
            return Ok((Vec::new(), members));
        }

        let (groups, dn_members) = self.groups_and_members().await?;
        members.extend(dn_members);
        Ok((groups, members))
    }

    /// Depth-first walk returning (subgroups, members)
    async fn walk(&self) -> Result<(Vec<DirectoryEntry>, Vec<DirectoryEntry>)> {
        let (direct_groups, mut members) = self.direct().await?;

        let mut visited = HashSet::from([normalize_dn(self.dn())]);
        let mut stack: Vec<DirectoryEntry> = direct_groups
            .into_iter()
            .filter(|g| visited.insert(normalize_dn(g.dn())))
            .collect();
        let mut subgroups = Vec::new();

        while let Some(group) = stack.pop() {
            let (groups, found) = self.child(group.clone()).direct().await?;
            members.extend(found);
            subgroups.push(group);

            for nested in groups {
                if visited.insert(normalize_dn(nested.dn())) {
                    stack.push(nested);
                } else {
                    debug!("Already visited {}", nested.dn());
                }
            }
        }

        Ok((subgroups, dedup_by_dn(members)))
    }
}

fn traversal_kind(session: &LdapSession, entry: &DirectoryEntry) -> GroupKind {
    if session.posix_support_enabled() && entry.is_posix_group() {
        GroupKind::Posix
    } else {
        GroupKind::Classic
    }
}

/// Keep the first entry seen for each DN
pub(crate) fn dedup_by_dn(entries: Vec<DirectoryEntry>) -> Vec<DirectoryEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(normalize_dn(e.dn())))
        .collect()
}
