//! Member enumeration
//!
//! Given a group, list every entry that belongs to it, through nested
//! subgroups where the strategy supports nesting.

mod active_directory;
mod classic;
mod recursive;

pub use active_directory::ActiveDirectoryMemberSearch;
pub use classic::ClassicMemberSearch;
pub use recursive::RecursiveMemberSearch;

use crate::session::LdapSession;
use crate::strategy::MemberSearchKind;
use async_trait::async_trait;
use nestor_core::types::{DirectoryEntry, MEMBERSHIP_ATTRIBUTES, MEMBER_UID_ATTRIBUTE};
use nestor_core::Result;

/// Attributes every member search asks for
pub(crate) const DEFAULT_ATTRIBUTES: [&str; 4] = [
    MEMBERSHIP_ATTRIBUTES[0],
    MEMBERSHIP_ATTRIBUTES[1],
    MEMBER_UID_ATTRIBUTE,
    "objectClass",
];

/// A member enumeration strategy
#[async_trait]
pub trait SearchMembers: Send + Sync {
    async fn perform(&self, group: &DirectoryEntry) -> Result<Vec<DirectoryEntry>>;
}

/// The member search selected for a session
pub enum MemberSearch {
    Classic(ClassicMemberSearch),
    Recursive(RecursiveMemberSearch),
    ActiveDirectory(ActiveDirectoryMemberSearch),
}

impl MemberSearch {
    pub fn new(kind: MemberSearchKind, session: LdapSession) -> Self {
        match kind {
            MemberSearchKind::Classic => MemberSearch::Classic(ClassicMemberSearch::new(session)),
            MemberSearchKind::Recursive => MemberSearch::Recursive(RecursiveMemberSearch::new(session)),
            MemberSearchKind::ActiveDirectory => {
                MemberSearch::ActiveDirectory(ActiveDirectoryMemberSearch::new(session))
            }
        }
    }

    pub fn kind(&self) -> MemberSearchKind {
        match self {
            MemberSearch::Classic(_) => MemberSearchKind::Classic,
            MemberSearch::Recursive(_) => MemberSearchKind::Recursive,
            MemberSearch::ActiveDirectory(_) => MemberSearchKind::ActiveDirectory,
        }
    }
}

#[async_trait]
impl SearchMembers for MemberSearch {
    async fn perform(&self, group: &DirectoryEntry) -> Result<Vec<DirectoryEntry>> {
        match self {
            MemberSearch::Classic(s) => s.perform(group).await,
            MemberSearch::Recursive(s) => s.perform(group).await,
            MemberSearch::ActiveDirectory(s) => s.perform(group).await,
        }
    }
}

/// Requested attributes: the defaults plus any extras, without repeats
pub(crate) fn attributes(extra: &[String]) -> Vec<String> {
    let mut attributes: Vec<String> = DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect();
    for attr in extra {
        if !attributes.iter().any(|a| a.eq_ignore_ascii_case(attr)) {
            attributes.push(attr.clone());
        }
    }
    attributes
}
