//! CLI command implementations

pub mod check;
pub mod connection;
pub mod members;
pub mod user;

use crate::OutputFormat;
use anyhow::Result;
use nestor_core::types::DirectoryEntry;
use nestor_ldap::LdapSession;
use serde::Serialize;
use std::collections::BTreeMap;

/// Context passed to all commands
pub struct CommandContext {
    pub session: LdapSession,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        self.output_format == OutputFormat::Json
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// First entry found for `login` across the search domains
    pub async fn find_user(&self, login: &str) -> Result<Option<DirectoryEntry>> {
        for domain in self.session.search_domains() {
            if let Some(user) = domain.user(login).await? {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}

/// Entry flattened for display
#[derive(Serialize)]
pub struct EntryView {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl From<&DirectoryEntry> for EntryView {
    fn from(entry: &DirectoryEntry) -> Self {
        Self {
            dn: entry.dn().to_string(),
            attributes: entry
                .attribute_names()
                .map(|name| (name.to_string(), entry.get(name).to_vec()))
                .collect(),
        }
    }
}

pub fn print_entry(entry: &DirectoryEntry) {
    println!("dn: {}", entry.dn());
    for name in entry.attribute_names() {
        for value in entry.get(name) {
            println!("{}: {}", name, value);
        }
    }
}
