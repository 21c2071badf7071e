//! Filter builders used by the membership strategies
//!
//! Pure functions; none of them touch the network. Values are carried
//! literally and escaped when the filter is rendered.

use nestor_core::types::{DirectoryEntry, Filter, GROUP_CLASS_NAMES, MEMBERSHIP_ATTRIBUTES, MEMBER_UID_ATTRIBUTE};
use nestor_core::IN_CHAIN_MATCHING_RULE_OID;

/// Entries that list `dn` as a member, or any entry with members at all
pub fn member_filter(dn: Option<&str>) -> Filter {
    let filters = MEMBERSHIP_ATTRIBUTES.iter().map(|attr| match dn {
        Some(dn) => Filter::eq(*attr, dn),
        None => Filter::present(*attr),
    });

    Filter::Or(filters.collect())
}

/// Groups listing the entry's uid under `memberUid`
///
/// `None` when the entry carries no value for `uid_attribute`.
pub fn posix_member_filter(entry: &DirectoryEntry, uid_attribute: &str) -> Option<Filter> {
    Filter::any(
        entry
            .get(uid_attribute)
            .iter()
            .map(|uid| Filter::eq(MEMBER_UID_ATTRIBUTE, uid.as_str())),
    )
}

/// Groups named by `cn`
pub fn group_filter<S: AsRef<str>>(names: &[S]) -> Option<Filter> {
    Filter::any(names.iter().map(|name| Filter::eq("cn", name.as_ref())))
}

/// Single-user lookup by login attribute
pub fn login_filter(uid_attribute: &str, login: &str) -> Filter {
    Filter::eq(uid_attribute, login)
}

/// Entries that are transitive members of any of `group_dns` (ActiveDirectory)
pub fn membership_in_chain_filter<S: AsRef<str>>(group_dns: &[S]) -> Option<Filter> {
    Filter::any(group_dns.iter().map(|dn| in_chain_filter(dn.as_ref())))
}

/// Every transitive member of `group_dn` (ActiveDirectory)
pub fn in_chain_filter(group_dn: &str) -> Filter {
    Filter::extensible("memberOf", IN_CHAIN_MATCHING_RULE_OID, group_dn)
}

/// Entries whose back-link attribute names `group_dn`
pub fn members_of_group(group_dn: &str, backlink_attribute: &str) -> Filter {
    Filter::eq(backlink_attribute, group_dn)
}

/// Groups whose back-link attribute names `group_dn`
pub fn subgroups_of_group(group_dn: &str, backlink_attribute: &str) -> Filter {
    members_of_group(group_dn, backlink_attribute) & all_groups_filter()
}

/// Any entry classified as a group
pub fn all_groups_filter() -> Filter {
    Filter::Or(
        GROUP_CLASS_NAMES
            .iter()
            .map(|class| Filter::eq("objectClass", *class))
            .collect(),
    )
}
