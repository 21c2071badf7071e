//! Strategy selection
//!
//! A configured name picks a strategy directly. Anything else, including
//! names nobody recognizes, falls back to detection: ActiveDirectory when
//! the server advertises in-chain support, otherwise Recursive (or Classic
//! when the recursive fallback is switched off).

use crate::capabilities::Capabilities;
use std::fmt;
use tracing::debug;

/// Membership validation strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    Classic,
    Recursive,
    ActiveDirectory,
    VirtualAttributes,
}

/// Member enumeration strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberSearchKind {
    Classic,
    Recursive,
    ActiveDirectory,
}

pub(crate) trait StrategyKind: Copy + fmt::Display {
    const CLASSIC: Self;
    const RECURSIVE: Self;
    const ACTIVE_DIRECTORY: Self;

    fn from_name(name: &str) -> Option<Self>;
}

impl ValidatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorKind::Classic => "classic",
            ValidatorKind::Recursive => "recursive",
            ValidatorKind::ActiveDirectory => "active_directory",
            ValidatorKind::VirtualAttributes => "virtual_attributes",
        }
    }
}

impl StrategyKind for ValidatorKind {
    const CLASSIC: Self = ValidatorKind::Classic;
    const RECURSIVE: Self = ValidatorKind::Recursive;
    const ACTIVE_DIRECTORY: Self = ValidatorKind::ActiveDirectory;

    fn from_name(name: &str) -> Option<Self> {
        match normalize(name).as_str() {
            "classic" => Some(ValidatorKind::Classic),
            "recursive" => Some(ValidatorKind::Recursive),
            "active_directory" => Some(ValidatorKind::ActiveDirectory),
            "virtual_attributes" => Some(ValidatorKind::VirtualAttributes),
            _ => None,
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MemberSearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberSearchKind::Classic => "classic",
            MemberSearchKind::Recursive => "recursive",
            MemberSearchKind::ActiveDirectory => "active_directory",
        }
    }
}

impl StrategyKind for MemberSearchKind {
    const CLASSIC: Self = MemberSearchKind::Classic;
    const RECURSIVE: Self = MemberSearchKind::Recursive;
    const ACTIVE_DIRECTORY: Self = MemberSearchKind::ActiveDirectory;

    fn from_name(name: &str) -> Option<Self> {
        match normalize(name).as_str() {
            "classic" => Some(MemberSearchKind::Classic),
            "recursive" => Some(MemberSearchKind::Recursive),
            "active_directory" => Some(MemberSearchKind::ActiveDirectory),
            _ => None,
        }
    }
}

impl fmt::Display for MemberSearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `ActiveDirectory`, `active-directory` and `activedirectory` all name the same strategy
fn normalize(name: &str) -> String {
    let name = name.trim().to_lowercase().replace('-', "_");
    match name.as_str() {
        "activedirectory" => "active_directory".to_string(),
        "virtualattributes" => "virtual_attributes".to_string(),
        _ => name,
    }
}

/// Resolve a strategy from its configured name or by probing the server
pub(crate) async fn select<K: StrategyKind>(
    configured: Option<&str>,
    recursive_fallback: bool,
    capabilities: &Capabilities,
) -> K {
    if let Some(kind) = configured.and_then(K::from_name) {
        debug!("Using configured strategy {}", kind);
        return kind;
    }

    if let Some(name) = configured {
        debug!("Unknown strategy {:?}, detecting", name);
    }

    if capabilities.active_directory_capable().await {
        K::ACTIVE_DIRECTORY
    } else if recursive_fallback {
        K::RECURSIVE
    } else {
        K::CLASSIC
    }
}
