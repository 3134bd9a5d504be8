//! Authenticated Zabbix API session.
//!
//! A [`Session`] is created by logging in with [`Session::login`] (or
//! restored from a [`CachedSession`] record) and is then used to issue
//! JSON-RPC calls against the `api_jsonrpc.php` endpoint.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::error::{Error, Result};
use crate::rpc::{ApiVersion, Request, Response};

/// Default timeout for requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body kept in [`Error::Status`].
const MAX_ERROR_BODY: usize = 512;

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP settings shared by the login call and every call made afterwards.
#[derive(Debug, Clone)]
pub struct Transport {
    /// Accept invalid or self-signed server certificates.
    pub skip_tls_verify: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent header.
    pub user_agent: String,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            skip_tls_verify: false,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

impl Transport {
    fn http_client(&self) -> Result<reqwest::Client> {
        let http = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.skip_tls_verify)
            .build()?;
        Ok(http)
    }
}

pub(crate) fn default_user_agent() -> String {
    format!("zabbix-client/{}", env!("CARGO_PKG_VERSION"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Authenticated handle to a Zabbix API endpoint.
#[derive(Clone)]
pub struct Session {
    url: Url,
    token: String,
    version: ApiVersion,
    created_at: DateTime<Utc>,
    transport: Transport,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl Session {
    /// Log in to `endpoint` with default transport settings.
    pub async fn login(
        endpoint: &str,
        username: &str,
        password: &str,
        skip_tls_verify: bool,
    ) -> Result<Self> {
        let transport = Transport {
            skip_tls_verify,
            ..Transport::default()
        };
        Self::login_with(endpoint, username, password, transport).await
    }

    /// Log in to `endpoint` using the given transport settings.
    ///
    /// Queries `apiinfo.version` first so the login parameters and the way
    /// the token is sent match what the server expects.
    pub async fn login_with(
        endpoint: &str,
        username: &str,
        password: &str,
        transport: Transport,
    ) -> Result<Self> {
        let url = Url::parse(endpoint)?;
        let http = transport.http_client()?;
        let version = fetch_version(&http, &url, 1).await?;

        tracing::debug!(url = %url, version = %version, "Logging in to Zabbix API");

        let params = if version.uses_username_param() {
            json!({ "username": username, "password": password })
        } else {
            json!({ "user": username, "password": password })
        };
        let token: String =
            send(http.post(url.clone()).json(&Request::new("user.login", params, 2))).await?;

        if token.is_empty() {
            return Err(Error::Auth("server returned an empty session token".to_string()));
        }

        Ok(Self {
            url,
            token,
            version,
            created_at: Utc::now(),
            transport,
            http,
            next_id: Arc::new(AtomicU64::new(3)),
        })
    }

    /// Build a session from an already issued token without contacting the server.
    pub fn with_token(
        endpoint: &str,
        token: impl Into<String>,
        version: ApiVersion,
        transport: Transport,
    ) -> Result<Self> {
        let url = Url::parse(endpoint)?;
        let http = transport.http_client()?;
        Ok(Self {
            url,
            token: token.into(),
            version,
            created_at: Utc::now(),
            transport,
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Rebuild a session from a persisted record.
    pub fn from_cached(record: CachedSession) -> Result<Self> {
        let version = record.api_version.parse()?;
        let transport = Transport {
            skip_tls_verify: record.skip_tls_verify,
            timeout: Duration::from_secs(record.timeout_secs),
            ..Transport::default()
        };
        let mut session = Self::with_token(&record.url, record.token, version, transport)?;
        session.created_at = record.created_at;
        Ok(session)
    }

    /// Snapshot this session into a serializable record.
    pub fn to_cached(&self) -> CachedSession {
        CachedSession {
            url: self.url.to_string(),
            token: self.token.clone(),
            api_version: self.version.to_string(),
            skip_tls_verify: self.transport.skip_tls_verify,
            timeout_secs: self.transport.timeout.as_secs(),
            created_at: self.created_at,
        }
    }

    /// API endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Auth token issued by `user.login`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Server API version.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// When the session was established.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether certificate verification is disabled for this session.
    pub fn skips_tls_verify(&self) -> bool {
        self.transport.skip_tls_verify
    }

    /// Make an authenticated API call.
    ///
    /// ```no_run
    /// # async fn example(session: zabbix_client::Session) -> zabbix_client::Result<()> {
    /// let hosts: serde_json::Value = session
    ///     .call("host.get", serde_json::json!({ "output": ["hostid", "host"] }))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut request = Request::new(method, params, id);
        let mut builder = self.http.post(self.url.clone());

        if self.version.uses_bearer_auth() {
            builder = builder.bearer_auth(&self.token);
        } else {
            request = request.with_auth(&self.token);
        }

        tracing::trace!(method, id, "Zabbix API call");
        send(builder.json(&request)).await
    }

    /// Ask the server for its current API version.
    pub async fn api_version(&self) -> Result<ApiVersion> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        fetch_version(&self.http, &self.url, id).await
    }

    /// Invalidate the token on the server.
    pub async fn logout(&self) -> Result<()> {
        let ok: bool = self.call("user.logout", json!([])).await?;
        if !ok {
            return Err(Error::Auth("server refused to log out".to_string()));
        }
        tracing::debug!(url = %self.url, "Logged out of Zabbix API");
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.url.as_str())
            .field("token", &"<redacted>")
            .field("version", &self.version)
            .field("created_at", &self.created_at)
            .field("skip_tls_verify", &self.transport.skip_tls_verify)
            .finish()
    }
}

/// Query the API version of `endpoint` without logging in.
pub async fn server_version(endpoint: &str, transport: &Transport) -> Result<ApiVersion> {
    let url = Url::parse(endpoint)?;
    let http = transport.http_client()?;
    fetch_version(&http, &url, 1).await
}

/// `apiinfo.version` must be sent without any auth token.
async fn fetch_version(http: &reqwest::Client, url: &Url, id: u64) -> Result<ApiVersion> {
    let raw: String = send(
        http.post(url.clone())
            .json(&Request::new("apiinfo.version", json!([]), id)),
    )
    .await?;
    raw.parse()
}

/// Send a JSON-RPC request and unwrap the response envelope.
async fn send<R: DeserializeOwned>(builder: reqwest::RequestBuilder) -> Result<R> {
    let response = builder.send().await?;
    let status = response.status();

    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    let envelope: Response<R> = serde_json::from_slice(&bytes)?;
    envelope.into_result()
}

// ─────────────────────────────────────────────────────────────────────────────
// Cached session record
// ─────────────────────────────────────────────────────────────────────────────

/// Serializable form of a [`Session`] used by persistent caches.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedSession {
    pub url: String,
    pub token: String,
    pub api_version: String,
    #[serde(default)]
    pub skip_tls_verify: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub created_at: DateTime<Utc>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl fmt::Debug for CachedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSession")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("created_at", &self.created_at)
            .finish()
    }
}
