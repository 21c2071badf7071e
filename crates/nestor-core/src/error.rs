//! Error types for Nestor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Connectivity Errors
    #[error("LDAP connection failed: {0}")]
    Connection(String),

    #[error("LDAP bind failed: {0}")]
    Bind(String),

    #[error("LDAP operation timed out")]
    Timeout,

    // Operation Errors
    #[error("LDAP search failed: {0}")]
    Search(String),

    #[error("LDAP protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    InvalidUrl(String),

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal Errors
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Connection(_) => "ConnectionFailed",
            Error::Bind(_) => "BindFailed",
            Error::Timeout => "Timeout",
            Error::Search(_) => "SearchFailed",
            Error::Protocol(_) => "ProtocolError",
            Error::InvalidUrl(_) => "InvalidUrl",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::InternalError(_) => "InternalError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// Connectivity failures, as opposed to protocol or usage errors
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Timeout | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Timeout.code(), "Timeout");
        assert_eq!(Error::Search("x".into()).code(), "SearchFailed");
        assert_eq!(
            Error::InvalidUrl("Invalid LDAP URL: x".into()).to_string(),
            "Invalid LDAP URL: x"
        );
    }

    #[test]
    fn test_connection_classification() {
        assert!(Error::Connection("refused".into()).is_connection_error());
        assert!(Error::Timeout.is_connection_error());
        assert!(!Error::Bind("bad password".into()).is_connection_error());
        assert!(!Error::InvalidConfig("port".into()).is_connection_error());
    }
}
