//! Client builder and session acquisition.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::cache::SharedSessionCache;
use crate::error::{Error, Result};
use crate::session::{DEFAULT_TIMEOUT, Session, Transport, default_user_agent};

/// Create a client builder for a Zabbix API endpoint.
///
/// The endpoint is the full URL of `api_jsonrpc.php`.
pub fn create_client(api_endpoint: impl Into<String>) -> ClientBuilder {
    ClientBuilder::new(api_endpoint)
}

/// Username and password for `user.login`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Builder for connecting to a Zabbix API.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use zabbix_client::{FileSessionCache, create_client};
///
/// # async fn example() -> zabbix_client::Result<()> {
/// let session = create_client("https://zabbix.example.com/api_jsonrpc.php")
///     .with_credentials("Admin", "zabbix")
///     .with_cache(Arc::new(FileSessionCache::new()))
///     .connect()
///     .await?;
///
/// println!("Connected to Zabbix {}", session.version());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    url: String,
    credentials: Credentials,
    skip_tls_verify: bool,
    cache: Option<SharedSessionCache>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults: no credentials, no cache, TLS verified.
    pub fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            url: api_endpoint.into(),
            credentials: Credentials::default(),
            skip_tls_verify: false,
            cache: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the cache used to reuse sessions between connects.
    pub fn with_cache(mut self, cache: SharedSessionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials::new(username, password);
        self
    }

    /// Disable certificate verification for the API endpoint.
    ///
    /// There is no way to turn verification back on for this builder.
    pub fn skip_tls_verify(mut self) -> Self {
        self.skip_tls_verify = true;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Get the API endpoint.
    pub fn endpoint(&self) -> &str {
        &self.url
    }

    /// Get the configured credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether a session cache was configured.
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Whether certificate verification is disabled.
    pub fn skips_tls_verify(&self) -> bool {
        self.skip_tls_verify
    }

    fn transport(&self) -> Transport {
        Transport {
            skip_tls_verify: self.skip_tls_verify,
            timeout: self.timeout,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(default_user_agent),
        }
    }

    fn is_same_endpoint(&self, session: &Session) -> bool {
        Url::parse(&self.url).is_ok_and(|url| &url == session.url())
    }

    /// Connect to the API, reusing a cached session when one is available.
    ///
    /// A cached session that cannot be loaded, or that was issued by a
    /// different endpoint, is treated as a miss and a fresh login is made. Login errors are returned as-is.
    ///
    /// When a cache is configured and storing the new session fails, the
    /// result is [`Error::CacheSave`], which still carries the usable
    /// session (see [`Error::into_session`]).
    pub async fn connect(&self) -> Result<Session> {
        if let Some(cache) = &self.cache
            && cache.has_session()
        {
            match cache.get_session().await {
                Ok(session) if self.is_same_endpoint(&session) => {
                    tracing::debug!(url = %self.url, "Reusing cached Zabbix session");
                    return Ok(session);
                }
                Ok(session) => {
                    tracing::debug!(
                        cached = %session.url(),
                        url = %self.url,
                        "Cached session belongs to another endpoint, logging in"
                    );
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Cached session unusable, logging in");
                }
            }
        }

        let session = Session::login_with(
            &self.url,
            &self.credentials.username,
            &self.credentials.password,
            self.transport(),
        )
        .await?;

        if let Some(cache) = &self.cache
            && let Err(e) = cache.save_session(&session).await
        {
            return Err(Error::CacheSave {
                session: Box::new(session),
                source: Box::new(e),
            });
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemorySessionCache;
    use std::sync::Arc;

    const ENDPOINT: &str = "http://zabbix.local/api_jsonrpc.php";

    #[test]
    fn test_builder_defaults() {
        let builder = create_client(ENDPOINT);
        assert_eq!(builder.endpoint(), ENDPOINT);
        assert!(!builder.has_cache());
        assert!(!builder.skips_tls_verify());
        assert_eq!(builder.credentials(), &Credentials::default());
    }

    #[test]
    fn test_builder_chains_in_any_order() {
        let cache = Arc::new(InMemorySessionCache::new());

        let a = create_client(ENDPOINT)
            .skip_tls_verify()
            .with_credentials("Admin", "zabbix")
            .with_cache(cache.clone());
        let b = create_client(ENDPOINT)
            .with_cache(cache)
            .skip_tls_verify()
            .with_credentials("Admin", "zabbix");

        for builder in [a, b] {
            assert!(builder.has_cache());
            assert!(builder.skips_tls_verify());
            assert_eq!(builder.credentials().username, "Admin");
            assert_eq!(builder.credentials().password, "zabbix");
        }
    }

    #[test]
    fn test_skip_tls_verify_is_sticky() {
        let builder = create_client(ENDPOINT)
            .skip_tls_verify()
            .skip_tls_verify()
            .timeout(Duration::from_secs(5));
        assert!(builder.skips_tls_verify());
        assert!(builder.transport().skip_tls_verify);
    }

    #[test]
    fn test_transport_uses_custom_user_agent() {
        let transport = create_client(ENDPOINT)
            .user_agent("monitoring-bot/1.0")
            .timeout(Duration::from_secs(5))
            .transport();
        assert_eq!(transport.user_agent, "monitoring-bot/1.0");
        assert_eq!(transport.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_same_endpoint_compares_parsed_urls() {
        let session = Session::with_token(
            "HTTP://Zabbix.Local/api_jsonrpc.php",
            "t",
            crate::rpc::ApiVersion::new(6, 0, 0),
            Transport::default(),
        )
        .unwrap();

        assert!(create_client(ENDPOINT).is_same_endpoint(&session));
        assert!(!create_client("http://other.local/api_jsonrpc.php").is_same_endpoint(&session));
        assert!(!create_client("not a url").is_same_endpoint(&session));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("Admin", "hunter2"));
        assert!(debug.contains("Admin"));
        assert!(!debug.contains("hunter2"));
    }
}
