//! LDAP URLs (RFC 4516) as they appear in referrals
//!
//! `ldap://host:port/base_dn?attributes?scope?filter`

use nestor_core::types::SearchScope;
use nestor_core::{Error, Result, DEFAULT_LDAP_PORT, DEFAULT_LDAPS_PORT};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A parsed LDAP URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapUrl {
    raw: String,
    secure: bool,
    host: String,
    port: Option<u16>,
    dn: String,
    attributes: Option<String>,
    scope: Option<String>,
    filter: Option<String>,
}

impl LdapUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidUrl(format!("Invalid LDAP URL: {}", raw));

        let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
        let secure = match url.scheme() {
            "ldap" => false,
            "ldaps" => true,
            _ => return Err(invalid()),
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(invalid)?
            .to_string();

        let dn = decode(url.path().trim_start_matches('/')).ok_or_else(invalid)?;

        let mut parts = url.query().unwrap_or_default().splitn(3, '?');
        let mut next_part = || parts.next().and_then(decode);
        let (attributes, scope, filter) = match url.query() {
            Some(_) => (next_part(), next_part(), next_part()),
            None => (None, None, None),
        };

        Ok(Self {
            raw: raw.to_string(),
            secure,
            host,
            port: url.port(),
            dn,
            attributes,
            scope,
            filter,
        })
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "ldaps"
        } else {
            "ldap"
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the scheme default
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.secure {
            DEFAULT_LDAPS_PORT
        } else {
            DEFAULT_LDAP_PORT
        })
    }

    /// Port only when the URL names one
    pub fn explicit_port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Base DN, empty when absent
    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn attributes(&self) -> Option<&str> {
        self.attributes.as_deref()
    }

    /// Raw scope component
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Scope component mapped onto a search scope, base by default
    pub fn search_scope(&self) -> SearchScope {
        match self.scope.as_deref() {
            Some("sub") => SearchScope::Subtree,
            Some("one") => SearchScope::OneLevel,
            _ => SearchScope::Base,
        }
    }
}

impl FromStr for LdapUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LdapUrl::parse(s)
    }
}

impl fmt::Display for LdapUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn decode(component: &str) -> Option<String> {
    percent_decode_str(component)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERRAL: &str = "ldap://dc4.ghe.local:123/CN=Maggie%20Mae,CN=Users,DC=dc4,DC=ghe,DC=local?cn,mail,telephoneNumber?base?(cn=Charlie)";

    #[test]
    fn test_parse_full_url() {
        let url = LdapUrl::parse(REFERRAL).unwrap();
        assert_eq!(url.host(), "dc4.ghe.local");
        assert_eq!(url.port(), 123);
        assert_eq!(url.dn(), "CN=Maggie Mae,CN=Users,DC=dc4,DC=ghe,DC=local");
        assert_eq!(url.attributes(), Some("cn,mail,telephoneNumber"));
        assert_eq!(url.scope(), Some("base"));
        assert_eq!(url.filter(), Some("(cn=Charlie)"));
        assert_eq!(url.search_scope(), SearchScope::Base);
        assert_eq!(url.to_string(), REFERRAL);
    }

    #[test]
    fn test_default_port() {
        let url = LdapUrl::parse("ldap://dc4.ghe.local/CN=Maggie,DC=dc4,DC=ghe,DC=local").unwrap();
        assert_eq!(url.port(), 389);
        assert_eq!(url.explicit_port(), None);

        let url = LdapUrl::parse("ldaps://dc4.ghe.local").unwrap();
        assert_eq!(url.port(), 636);
        assert!(url.is_secure());
        assert_eq!(url.scheme(), "ldaps");
    }

    #[test]
    fn test_missing_dn_and_query() {
        let url = LdapUrl::parse("ldap://dc4.ghe.local").unwrap();
        assert_eq!(url.dn(), "");
        assert_eq!(url.attributes(), None);
        assert_eq!(url.scope(), None);
        assert_eq!(url.filter(), None);
    }

    #[test]
    fn test_scope_mapping() {
        let scope = |s: &str| {
            LdapUrl::parse(&format!("ldap://dc4.ghe.local/DC=ghe?cn?{}?(cn=x)", s))
                .unwrap()
                .search_scope()
        };

        assert_eq!(scope("sub"), SearchScope::Subtree);
        assert_eq!(scope("one"), SearchScope::OneLevel);
        assert_eq!(scope("base"), SearchScope::Base);
        assert_eq!(scope(""), SearchScope::Base);
    }

    #[test]
    fn test_invalid_urls() {
        for raw in ["not a url", "", "http://dc4.ghe.local/DC=ghe"] {
            let err = LdapUrl::parse(raw).unwrap_err();
            assert_eq!(err.code(), "InvalidUrl");
            assert_eq!(err.to_string(), format!("Invalid LDAP URL: {}", raw));
            assert!(!LdapUrl::is_valid(raw));
        }
        assert!(LdapUrl::is_valid(REFERRAL));
    }
}
