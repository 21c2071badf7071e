//! Directory entries and group classification
//!
//! An entry is an immutable snapshot of a search result: a DN plus
//! multi-valued attributes. Attribute names are case-insensitive and an
//! absent attribute reads as an empty list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Object classes that mark an entry as a group
pub const GROUP_CLASS_NAMES: [&str; 4] = ["groupOfNames", "groupOfUniqueNames", "posixGroup", "group"];

/// Attributes that hold member DNs
pub const MEMBERSHIP_ATTRIBUTES: [&str; 2] = ["member", "uniqueMember"];

/// Attribute that holds POSIX member uids
pub const MEMBER_UID_ATTRIBUTE: &str = "memberUid";

/// Default back-link attribute maintained by the server
pub const DEFAULT_VIRTUAL_MEMBERSHIP_ATTRIBUTE: &str = "memberOf";

/// A directory entry returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    dn: String,
    /// Keyed by lowercased attribute name
    attributes: BTreeMap<String, Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Attribute {
    name: String,
    values: Vec<String>,
}

impl DirectoryEntry {
    /// Create an entry carrying only a DN
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Create an entry from a DN and raw attribute map
    pub fn from_parts<I, K, V>(dn: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        attributes
            .into_iter()
            .fold(Self::new(dn), |entry, (name, values)| entry.with_attribute(name, values))
    }

    /// Return a copy of this entry with values appended to an attribute
    pub fn with_attribute<V>(mut self, name: impl Into<String>, values: V) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let name = name.into();
        let slot = self
            .attributes
            .entry(name.to_lowercase())
            .or_insert_with(|| Attribute {
                name,
                values: Vec::new(),
            });
        slot.values.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// All values of an attribute, empty when absent
    pub fn get(&self, name: &str) -> &[String] {
        self.attributes
            .get(&name.to_lowercase())
            .map(|a| a.values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of an attribute
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }

    /// Whether the attribute carries at least one value
    pub fn has(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }

    /// Attribute names as originally spelled
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.values().map(|a| a.name.as_str())
    }

    pub fn object_classes(&self) -> &[String] {
        self.get("objectClass")
    }

    /// True when objectClass intersects [`GROUP_CLASS_NAMES`]
    pub fn is_group(&self) -> bool {
        is_group_class(self.object_classes())
    }

    pub fn is_posix_group(&self) -> bool {
        self.object_classes()
            .iter()
            .any(|oc| oc.eq_ignore_ascii_case("posixGroup"))
    }

    /// Direct member DNs from `member` and `uniqueMember`
    pub fn member_dns(&self) -> Vec<&str> {
        MEMBERSHIP_ATTRIBUTES
            .iter()
            .flat_map(|attr| self.get(attr))
            .map(String::as_str)
            .collect()
    }

    pub fn member_uids(&self) -> &[String] {
        self.get(MEMBER_UID_ATTRIBUTE)
    }

    /// A group that lists members by DN
    pub fn has_dn_members(&self) -> bool {
        MEMBERSHIP_ATTRIBUTES.iter().any(|attr| self.has(attr))
    }

    /// A POSIX group that also lists DN members
    pub fn is_combined_group(&self) -> bool {
        self.is_posix_group() && self.has_dn_members()
    }

    /// Case-insensitive DN comparison
    pub fn dn_matches(&self, dn: &str) -> bool {
        dn_eq(&self.dn, dn)
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dn: {}", self.dn)?;
        for attr in self.attributes.values() {
            for value in &attr.values {
                writeln!(f, "{}: {}", attr.name, value)?;
            }
        }
        Ok(())
    }
}

/// Check objectClass values against the group classes
pub fn is_group_class<S: AsRef<str>>(object_classes: &[S]) -> bool {
    object_classes.iter().any(|oc| {
        GROUP_CLASS_NAMES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(oc.as_ref()))
    })
}

/// Normalized form of a DN for set membership and map keys
pub fn normalize_dn(dn: &str) -> String {
    dn.to_lowercase()
}

/// DNs are not case-sensitive
pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize_dn(a) == normalize_dn(b)
}

/// Whether `dn` lies under the naming context `suffix`
pub fn dn_ends_with(dn: &str, suffix: &str) -> bool {
    normalize_dn(dn).ends_with(&normalize_dn(suffix))
}
