//! Search requests and responses exchanged with a directory client

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DirectoryEntry, Filter};

/// Search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base object
    Base,
    /// Entries directly below the base
    OneLevel,
    /// The base and its whole subtree
    #[default]
    Subtree,
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchScope::Base => "base",
            SearchScope::OneLevel => "one",
            SearchScope::Subtree => "sub",
        };
        write!(f, "{}", s)
    }
}

/// A single search operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    /// `None` searches with the match-everything filter
    pub filter: Option<Filter>,
    /// Empty requests all user attributes
    pub attributes: Vec<String>,
    pub size_limit: Option<i32>,
    /// Surface referrals to the caller; otherwise a referral reads as no results
    pub return_referrals: bool,
}

impl SearchRequest {
    pub fn new(base: impl Into<String>, filter: Filter) -> Self {
        Self {
            base: base.into(),
            scope: SearchScope::Subtree,
            filter: Some(filter),
            attributes: Vec::new(),
            size_limit: None,
            return_referrals: false,
        }
    }

    /// Base-object read of a single entry
    pub fn base_object(dn: impl Into<String>) -> Self {
        Self {
            base: dn.into(),
            scope: SearchScope::Base,
            filter: None,
            attributes: Vec::new(),
            size_limit: None,
            return_referrals: false,
        }
    }

    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn size_limit(mut self, limit: i32) -> Self {
        self.size_limit = Some(limit);
        self
    }

    pub fn return_referrals(mut self, enabled: bool) -> Self {
        self.return_referrals = enabled;
        self
    }

    /// Same request against another base
    pub fn with_base(&self, base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..self.clone()
        }
    }

    /// Filter as sent on the wire
    pub fn filter_string(&self) -> String {
        self.filter
            .as_ref()
            .unwrap_or(&Filter::everything())
            .to_string()
    }
}

/// Result of a search: entries, or referral URLs when the server redirected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub entries: Vec<DirectoryEntry>,
    pub referrals: Vec<String>,
}

impl SearchResponse {
    pub fn entries(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            referrals: Vec::new(),
        }
    }

    pub fn referral(urls: Vec<String>) -> Self {
        Self {
            entries: Vec::new(),
            referrals: urls,
        }
    }

    pub fn is_referral(&self) -> bool {
        !self.referrals.is_empty()
    }
}
