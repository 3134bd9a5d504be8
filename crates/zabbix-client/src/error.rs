//! Client error types.

use thiserror::Error;

use crate::session::Session;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint answered with a non-success HTTP status.
    #[error("Unexpected HTTP status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Server returned a JSON-RPC error object.
    #[error("API error ({code}): {message} {data}")]
    Api {
        /// JSON-RPC error code.
        code: i64,
        /// Short error message.
        message: String,
        /// Detailed description from the server.
        data: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server answered with something that is not a valid API response.
    #[error("Unexpected API response: {0}")]
    Protocol(String),

    /// Session cache could not provide or store a session.
    #[error("Session cache error: {0}")]
    Cache(String),

    /// Login succeeded but the new session could not be cached.
    ///
    /// The session is valid and usable; recover it with [`Error::into_session`].
    #[error("Session established but not cached: {source}")]
    CacheSave {
        /// The freshly authenticated session.
        session: Box<Session>,
        /// Why the cache rejected it.
        source: Box<Error>,
    },
}

impl Error {
    /// Check if this is an authentication error.
    ///
    /// Zabbix reports bad credentials as a JSON-RPC error with code -32602
    /// and an expired or revoked token as -32500 with a "re-login" hint.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Auth(_) => true,
            Error::Status { status: 401, .. } => true,
            Error::Api { data, message, .. } => {
                let text = format!("{} {}", message, data).to_lowercase();
                text.contains("re-login")
                    || text.contains("not authorized")
                    || text.contains("incorrect user name or password")
            }
            _ => false,
        }
    }

    /// Check if this error came from the session cache.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Error::Cache(_) | Error::CacheSave { .. })
    }

    /// Take the usable session out of a [`Error::CacheSave`] error.
    pub fn into_session(self) -> Option<Session> {
        match self {
            Error::CacheSave { session, .. } => Some(*session),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_detection() {
        assert!(Error::Auth("empty token".to_string()).is_auth_error());
        assert!(
            Error::Api {
                code: -32602,
                message: "Invalid params.".to_string(),
                data: "Incorrect user name or password or account is temporarily blocked."
                    .to_string(),
            }
            .is_auth_error()
        );
        assert!(
            Error::Api {
                code: -32500,
                message: "Application error.".to_string(),
                data: "Session terminated, re-login, please.".to_string(),
            }
            .is_auth_error()
        );
        assert!(!Error::Protocol("x".to_string()).is_auth_error());
    }

    #[test]
    fn test_into_session_only_for_cache_save() {
        assert!(Error::Cache("missing".to_string()).into_session().is_none());
        assert!(Error::Cache("missing".to_string()).is_cache_error());
    }
}
