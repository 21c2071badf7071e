//! Membership validation
//!
//! Given an entry and candidate groups, decide whether the entry belongs
//! to any of them. An empty candidate list means the system is not gated
//! by groups and always validates.

mod active_directory;
mod classic;
mod recursive;
mod virtual_attributes;

pub use active_directory::ActiveDirectoryValidator;
pub use classic::ClassicValidator;
pub use recursive::RecursiveValidator;
pub use virtual_attributes::VirtualAttributesValidator;

use crate::session::LdapSession;
use crate::strategy::ValidatorKind;
use async_trait::async_trait;
use nestor_core::types::{normalize_dn, DirectoryEntry};
use nestor_core::Result;
use std::collections::HashSet;

/// Outcome of a membership check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    pub is_member: bool,
    /// Candidate groups the decision matched, when the strategy knows them
    pub groups: Vec<DirectoryEntry>,
}

impl Membership {
    pub fn granted(groups: Vec<DirectoryEntry>) -> Self {
        Self {
            is_member: true,
            groups,
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    /// No group gate configured
    pub fn unrestricted() -> Self {
        Self::granted(Vec::new())
    }
}

/// A membership validation strategy
#[async_trait]
pub trait ValidateMembership: Send + Sync {
    async fn perform(&self, entry: &DirectoryEntry, groups: &[DirectoryEntry]) -> Result<Membership>;
}

/// The validator selected for a session
pub enum MembershipValidator {
    Classic(ClassicValidator),
    Recursive(RecursiveValidator),
    ActiveDirectory(ActiveDirectoryValidator),
    VirtualAttributes(VirtualAttributesValidator),
}

impl MembershipValidator {
    pub fn new(kind: ValidatorKind, session: LdapSession) -> Self {
        match kind {
            ValidatorKind::Classic => MembershipValidator::Classic(ClassicValidator::new(session)),
            ValidatorKind::Recursive => MembershipValidator::Recursive(RecursiveValidator::new(session)),
            ValidatorKind::ActiveDirectory => {
                MembershipValidator::ActiveDirectory(ActiveDirectoryValidator::new(session))
            }
            ValidatorKind::VirtualAttributes => {
                MembershipValidator::VirtualAttributes(VirtualAttributesValidator::new(session))
            }
        }
    }

    pub fn kind(&self) -> ValidatorKind {
        match self {
            MembershipValidator::Classic(_) => ValidatorKind::Classic,
            MembershipValidator::Recursive(_) => ValidatorKind::Recursive,
            MembershipValidator::ActiveDirectory(_) => ValidatorKind::ActiveDirectory,
            MembershipValidator::VirtualAttributes(_) => ValidatorKind::VirtualAttributes,
        }
    }
}

#[async_trait]
impl ValidateMembership for MembershipValidator {
    async fn perform(&self, entry: &DirectoryEntry, groups: &[DirectoryEntry]) -> Result<Membership> {
        match self {
            MembershipValidator::Classic(v) => v.perform(entry, groups).await,
            MembershipValidator::Recursive(v) => v.perform(entry, groups).await,
            MembershipValidator::ActiveDirectory(v) => v.perform(entry, groups).await,
            MembershipValidator::VirtualAttributes(v) => v.perform(entry, groups).await,
        }
    }
}

/// Normalized candidate group DNs
pub(crate) fn group_dns(groups: &[DirectoryEntry]) -> HashSet<String> {
    groups.iter().map(|g| normalize_dn(g.dn())).collect()
}

/// Candidate groups among `dns`
pub(crate) fn matching_groups<'a, I>(groups: &[DirectoryEntry], dns: I) -> Vec<DirectoryEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let found: HashSet<String> = dns.into_iter().map(normalize_dn).collect();
    groups
        .iter()
        .filter(|g| found.contains(&normalize_dn(g.dn())))
        .cloned()
        .collect()
}
