//! CLI command handlers.

pub mod call;
pub mod context;
pub mod login;
pub mod logout;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use zabbix_client::{
    ClientBuilder, Error, FileSessionCache, Session, SharedSessionCache, Transport,
};
use zabbix_config::ClientConfig;

/// Session file prefix used when no context is selected.
const DEFAULT_SESSION_PREFIX: &str = "default";

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit client config file.
    pub config_path: Option<PathBuf>,
    /// Context name overriding `current-context`.
    pub context_name: Option<String>,
    /// Server URL override.
    pub server: Option<String>,
    /// Username override.
    pub user: Option<String>,
    /// Password override.
    pub password: Option<String>,
    /// Skip TLS verification.
    pub insecure: bool,
    /// Never read or write the session cache.
    pub no_cache: bool,
    /// Output as JSON for scripting.
    pub json_output: bool,
}

/// Everything needed to connect, after merging flags over the config file.
#[derive(Debug)]
pub struct Target {
    pub builder: ClientBuilder,
    pub cache: Option<SharedSessionCache>,
}

impl Context {
    /// Path of the client config file in use.
    pub fn config_file(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => zabbix_config::client_config_path()
                .ok_or_else(|| anyhow!("Could not determine config directory")),
        }
    }

    /// Load the client config file, or an empty one if it doesn't exist.
    pub fn load_config(&self) -> Result<ClientConfig> {
        let path = self.config_file()?;
        zabbix_config::load_client_config_from(Some(&path))
            .with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Resolve the server URL and transport settings, without credentials.
    pub fn endpoint(&self) -> Result<(String, Transport)> {
        let config = self.load_config()?;
        let selected = config.select(self.context_name.as_deref())?;
        self.resolve_endpoint(&config, selected)
    }

    fn resolve_endpoint(
        &self,
        config: &ClientConfig,
        selected: Option<&zabbix_config::Context>,
    ) -> Result<(String, Transport)> {
        let server = self
            .server
            .clone()
            .or_else(|| selected.map(|c| c.server.clone()))
            .ok_or_else(|| {
                anyhow!("No server configured. Pass --server or add one with 'zbx context set'")
            })?;

        let timeout = selected
            .map(|c| config.effective_timeout(c))
            .unwrap_or(config.defaults.timeout);

        let transport = Transport {
            skip_tls_verify: self.insecure || selected.is_some_and(|c| c.skip_tls_verify),
            timeout: Duration::from_secs(timeout),
            ..Transport::default()
        };

        Ok((server, transport))
    }

    /// Resolve the server, credentials and cache for this invocation.
    ///
    /// Command-line flags win over the selected config context.
    pub fn target(&self) -> Result<Target> {
        let config = self.load_config()?;
        let selected = config.select(self.context_name.as_deref())?;
        let (server, transport) = self.resolve_endpoint(&config, selected)?;

        let username = self
            .user
            .clone()
            .or_else(|| selected.and_then(|c| c.username.clone()))
            .ok_or_else(|| anyhow!("No username configured. Pass --user or set it on the context"))?;

        let password = match (&self.password, selected) {
            (Some(password), _) => password.clone(),
            (None, Some(context)) => context.resolve_password()?,
            (None, None) => return Err(anyhow!("No password configured. Pass --password")),
        };

        let mut builder = zabbix_client::create_client(server.clone())
            .with_credentials(username.clone(), password)
            .timeout(transport.timeout);
        if transport.skip_tls_verify {
            builder = builder.skip_tls_verify();
        }

        let cache = if self.no_cache || !config.defaults.cache_sessions {
            None
        } else {
            let lifetime = selected
                .map(|c| config.effective_session_lifetime(c))
                .unwrap_or(config.defaults.session_lifetime);
            // --server or --user may point elsewhere than the context does
            let path = match selected {
                Some(context) if self.server.is_none() && self.user.is_none() => {
                    context.session_cache_path()
                }
                _ => zabbix_config::session_cache_dir().map(|d| {
                    d.join(zabbix_config::session_file_name(
                        DEFAULT_SESSION_PREFIX,
                        &server,
                        &username,
                    ))
                }),
            };
            path.map(|path| {
                Arc::new(
                    FileSessionCache::with_path(path).with_lifetime(Duration::from_secs(lifetime)),
                ) as SharedSessionCache
            })
        };

        if let Some(cache) = &cache {
            builder = builder.with_cache(cache.clone());
        }

        Ok(Target { builder, cache })
    }

    /// Resolve the target and connect to it.
    pub async fn connect(&self) -> Result<(Target, Session)> {
        let target = self.target()?;
        let session = target.connect().await?;
        Ok((target, session))
    }
}

impl Target {
    /// Whether a cached session is available before connecting.
    pub fn has_cached_session(&self) -> bool {
        self.cache.as_ref().is_some_and(|c| c.has_session())
    }

    /// Connect, reusing a cached session when possible.
    ///
    /// A session that could not be cached is still used, with a warning.
    pub async fn connect(&self) -> Result<Session> {
        match self.builder.connect().await {
            Ok(session) => Ok(session),
            Err(e @ Error::CacheSave { .. }) => {
                tracing::warn!("{}", e);
                e.into_session()
                    .ok_or_else(|| anyhow!("session missing from cache error"))
            }
            Err(e) => Err(e).context("Failed to connect to Zabbix API"),
        }
    }
}
