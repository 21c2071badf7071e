//! Search filter expressions
//!
//! Filters are immutable trees. They are combined with `&` / `|` (or the
//! [`Filter::all`] / [`Filter::any`] reducers) and rendered to the RFC 4515
//! string form with `Display`. Assertion values are always escaped on
//! rendering, so an equality filter can never turn into a wildcard match.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// A search predicate over entry attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// `(attr=*)`
    Present(String),
    /// `(attr=value)`
    Equality(String, String),
    /// `(attr:rule:=value)`
    ExtensibleMatch {
        attribute: String,
        rule: String,
        value: String,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present(attribute.into())
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equality(attribute.into(), value.into())
    }

    pub fn extensible(
        attribute: impl Into<String>,
        rule: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Filter::ExtensibleMatch {
            attribute: attribute.into(),
            rule: rule.into(),
            value: value.into(),
        }
    }

    /// OR of all filters, `None` when there are none
    pub fn any<I: IntoIterator<Item = Filter>>(filters: I) -> Option<Filter> {
        filters.into_iter().reduce(|acc, f| acc | f)
    }

    /// AND of all filters, `None` when there are none
    pub fn all<I: IntoIterator<Item = Filter>>(filters: I) -> Option<Filter> {
        filters.into_iter().reduce(|acc, f| acc & f)
    }

    /// Matches every entry
    pub fn everything() -> Self {
        Filter::present("objectClass")
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        match self {
            Filter::Or(mut children) => {
                children.push(rhs);
                Filter::Or(children)
            }
            lhs => Filter::Or(vec![lhs, rhs]),
        }
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        match self {
            Filter::And(mut children) => {
                children.push(rhs);
                Filter::And(children)
            }
            lhs => Filter::And(vec![lhs, rhs]),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Present(attr) => write!(f, "({}=*)", attr),
            Filter::Equality(attr, value) => write!(f, "({}={})", attr, escape_filter_value(value)),
            Filter::ExtensibleMatch {
                attribute,
                rule,
                value,
            } => write!(f, "({}:{}:={})", attribute, rule, escape_filter_value(value)),
            Filter::And(children) => {
                write!(f, "(&")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
            Filter::Or(children) => {
                write!(f, "(|")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Escape an assertion value (RFC 4515 section 3)
///
/// Characters that must be escaped: * ( ) \ NUL
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            c => escaped.push(c),
        }
    }
    escaped
}
