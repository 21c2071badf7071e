//! Configuration for Nestor

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DEFAULT_LDAPS_PORT, DEFAULT_LDAP_PORT, DEFAULT_MAX_DEPTH};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestorConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NestorConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InternalError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        let dir = &mut config.directory;

        if let Ok(host) = std::env::var("NESTOR_HOST") {
            dir.host = host;
        }
        if let Ok(port) = std::env::var("NESTOR_PORT") {
            if let Ok(p) = port.parse() {
                dir.port = p;
            }
        }
        if let Ok(encryption) = std::env::var("NESTOR_ENCRYPTION") {
            if let Some(e) = Encryption::parse(&encryption) {
                dir.encryption = e;
            }
        }
        if let Ok(user) = std::env::var("NESTOR_ADMIN_USER") {
            dir.admin_user = user;
        }
        if let Ok(password) = std::env::var("NESTOR_ADMIN_PASSWORD") {
            dir.admin_password = password;
        }
        if let Ok(uid) = std::env::var("NESTOR_UID") {
            dir.uid = uid;
        }
        if let Ok(domains) = std::env::var("NESTOR_SEARCH_DOMAINS") {
            dir.search_domains = domains
                .split(';')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(strategy) = std::env::var("NESTOR_MEMBERSHIP_VALIDATOR") {
            dir.membership_validator = Some(strategy);
        }
        if let Ok(strategy) = std::env::var("NESTOR_MEMBER_SEARCH_STRATEGY") {
            dir.member_search_strategy = Some(strategy);
        }
        if let Ok(v) = std::env::var("NESTOR_POSIX_SUPPORT") {
            dir.posix_support = v != "false";
        }
        if let Ok(v) = std::env::var("NESTOR_RECURSIVE_GROUP_SEARCH_FALLBACK") {
            dir.recursive_group_search_fallback = v != "false";
        }
        if std::env::var("NESTOR_SEARCH_FOREST").map(|v| v == "true").unwrap_or(false) {
            dir.search_forest = true;
        }
        if let Ok(attr) = std::env::var("NESTOR_VIRTUAL_MEMBERSHIP") {
            dir.virtual_attributes = VirtualAttributesConfig::Custom {
                virtual_membership: attr,
            };
        }
        if let Ok(level) = std::env::var("NESTOR_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }
}

/// Directory server and membership strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Directory server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport encryption: none, simple_tls (ssl), start_tls (tls)
    #[serde(default)]
    pub encryption: Encryption,

    /// Service account DN used for searches
    #[serde(default)]
    pub admin_user: String,

    /// Service account password
    #[serde(default)]
    pub admin_password: String,

    /// Login attribute
    #[serde(default = "default_uid")]
    pub uid: String,

    /// Base DNs searched in order
    #[serde(default)]
    pub search_domains: Vec<String>,

    /// classic, recursive, active_directory; anything else detects
    #[serde(default)]
    pub membership_validator: Option<String>,

    /// classic, recursive, active_directory; anything else detects
    #[serde(default)]
    pub member_search_strategy: Option<String>,

    /// Resolve POSIX `memberUid` membership
    #[serde(default = "default_true")]
    pub posix_support: bool,

    /// Fall back to the recursive strategies when detection finds no AD support
    #[serde(default = "default_true")]
    pub recursive_group_search_fallback: bool,

    /// Server-maintained back-link attribute support
    #[serde(default)]
    pub virtual_attributes: VirtualAttributesConfig,

    /// Fan searches out across the domain controllers of an AD forest
    #[serde(default)]
    pub search_forest: bool,

    /// Capability OIDs that identify an ActiveDirectory server
    #[serde(default = "default_active_directory_oids")]
    pub active_directory_capability_oids: Vec<String>,

    /// Depth bound for the recursive strategies
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_LDAP_PORT
}

fn default_uid() -> String {
    "sAMAccountName".to_string()
}

fn default_true() -> bool {
    true
}

fn default_active_directory_oids() -> Vec<String> {
    vec![
        // ActiveDirectory 2003 (V51)
        "1.2.840.113556.1.4.1670".to_string(),
        // ActiveDirectory 2008 R2 (V61 R2)
        "1.2.840.113556.1.4.2080".to_string(),
    ]
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_timeout() -> u64 {
    10
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            encryption: Encryption::default(),
            admin_user: String::new(),
            admin_password: String::new(),
            uid: default_uid(),
            search_domains: Vec::new(),
            membership_validator: None,
            member_search_strategy: None,
            posix_support: true,
            recursive_group_search_fallback: true,
            virtual_attributes: VirtualAttributesConfig::default(),
            search_forest: false,
            active_directory_capability_oids: default_active_directory_oids(),
            max_depth: default_max_depth(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl DirectoryConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::Error::InvalidConfig("Host is required".to_string()));
        }

        if self.port == 0 {
            return Err(crate::Error::InvalidConfig("Port must be non-zero".to_string()));
        }

        Ok(())
    }

    /// Server URL handed to the LDAP client
    pub fn server_url(&self) -> String {
        format!("{}://{}:{}", self.encryption.scheme(), self.host, self.port)
    }
}

/// Transport encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encryption {
    #[default]
    None,
    /// TLS from connection start (ldaps)
    SimpleTls,
    /// Upgrade a plain connection with STARTTLS
    StartTls,
}

impl Encryption {
    /// Parse the accepted spellings, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "" | "none" | "plain" => Some(Encryption::None),
            "ssl" | "simple_tls" => Some(Encryption::SimpleTls),
            "tls" | "start_tls" => Some(Encryption::StartTls),
            _ => None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Encryption::None)
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Encryption::SimpleTls => "ldaps",
            _ => "ldap",
        }
    }

    /// Port used when none is given explicitly
    pub fn default_port(&self) -> u16 {
        match self {
            Encryption::None => DEFAULT_LDAP_PORT,
            _ => DEFAULT_LDAPS_PORT,
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Encryption::None => "none",
            Encryption::SimpleTls => "simple_tls",
            Encryption::StartTls => "start_tls",
        };
        write!(f, "{}", s)
    }
}

impl TryFrom<String> for Encryption {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Encryption::parse(&value).ok_or_else(|| format!("unknown encryption method: {}", value))
    }
}

impl From<Encryption> for String {
    fn from(value: Encryption) -> Self {
        value.to_string()
    }
}

/// `virtual_attributes = true` or `virtual_attributes = { virtual_membership = "attr" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VirtualAttributesConfig {
    Enabled(bool),
    Custom { virtual_membership: String },
}

impl Default for VirtualAttributesConfig {
    fn default() -> Self {
        VirtualAttributesConfig::Enabled(false)
    }
}

impl VirtualAttributesConfig {
    pub fn enabled(&self) -> bool {
        match self {
            VirtualAttributesConfig::Enabled(enabled) => *enabled,
            VirtualAttributesConfig::Custom { .. } => true,
        }
    }

    /// Back-link attribute name
    pub fn virtual_membership(&self) -> &str {
        match self {
            VirtualAttributesConfig::Custom { virtual_membership } => virtual_membership,
            VirtualAttributesConfig::Enabled(_) => crate::types::DEFAULT_VIRTUAL_MEMBERSHIP_ATTRIBUTE,
        }
    }
}

/// Logging Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    /// text or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
