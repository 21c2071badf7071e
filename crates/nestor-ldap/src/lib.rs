//! Nestor LDAP
//!
//! Nested group membership resolution against LDAP and ActiveDirectory
//! servers. A [`LdapSession`] wraps one directory connection, detects what
//! the server can do, and picks the cheapest way to answer two questions:
//! is this entry a member of any of these groups, and who belongs to this
//! group once nesting is unrolled.

pub mod capabilities;
pub mod client;
pub mod connection;
pub mod connection_cache;
pub mod domain;
pub mod filter;
pub mod forest;
pub mod group;
pub mod member_search;
pub mod membership;
pub mod referral;
pub mod session;
pub mod strategy;
pub mod url;
pub mod user_search;

#[cfg(test)]
pub(crate) mod testing;

pub use capabilities::Capabilities;
pub use client::{ConnectionOptions, Connector, DirectoryClient};
pub use connection::{LdapConnector, LdapDirectory};
pub use connection_cache::ConnectionCache;
pub use domain::Domain;
pub use forest::ForestSearch;
pub use group::{Group, GroupKind};
pub use member_search::{MemberSearch, SearchMembers};
pub use membership::{Membership, MembershipValidator, ValidateMembership};
pub use referral::ReferralChaser;
pub use session::LdapSession;
pub use strategy::{MemberSearchKind, ValidatorKind};
pub use url::LdapUrl;
pub use user_search::UserSearch;
