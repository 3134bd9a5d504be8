//! Client configuration for connecting to Zabbix servers.
//!
//! Implements a kubeconfig-style configuration with named contexts:
//!
//! ```yaml
//! api-version: v1
//! kind: ClientConfig
//!
//! current-context: prod
//!
//! contexts:
//!   - name: prod
//!     server: https://zabbix.example.com/api_jsonrpc.php
//!     username: Admin
//!     password:
//!       env: ZABBIX_PASSWORD
//!   - name: lab
//!     server: https://10.0.0.5/zabbix/api_jsonrpc.php
//!     username: Admin
//!     password:
//!       file: ~/.config/zbx/lab.pass
//!     skip-tls-verify: true
//!     session-lifetime: 600
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Client Config
// ─────────────────────────────────────────────────────────────────────────────

/// API version for the client config file format.
pub const API_VERSION: &str = "v1";

/// Kind identifier for client config files.
pub const KIND: &str = "ClientConfig";

/// Default config filename.
const CLIENT_CONFIG_FILE: &str = "client.yaml";

/// Root client configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// API version (always "v1" currently).
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Config kind (always "ClientConfig").
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Name of the current/default context.
    #[serde(default)]
    pub current_context: Option<String>,

    /// Named connection contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,

    /// Default settings applied to all contexts.
    #[serde(default)]
    pub defaults: ClientDefaults,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

impl ClientConfig {
    /// Create an empty client config.
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            ..Default::default()
        }
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        serde_yaml::from_str(yaml_str).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Serialize to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Get the current context, if set and valid.
    pub fn current(&self) -> Option<&Context> {
        self.current_context
            .as_ref()
            .and_then(|name| self.get_context(name))
    }

    /// Get a context by name.
    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Get a mutable context by name.
    pub fn get_context_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Pick a context by name, or the current one when `name` is `None`.
    pub fn select(&self, name: Option<&str>) -> Result<Option<&Context>> {
        match name {
            Some(name) => self
                .get_context(name)
                .map(Some)
                .ok_or_else(|| ConfigError::ContextNotFound(name.to_string())),
            None => Ok(self.current()),
        }
    }

    /// Add or update a context.
    pub fn set_context(&mut self, context: Context) {
        if let Some(existing) = self.get_context_mut(&context.name) {
            *existing = context;
        } else {
            self.contexts.push(context);
        }
    }

    /// Remove a context by name.
    pub fn remove_context(&mut self, name: &str) -> Option<Context> {
        let pos = self.contexts.iter().position(|c| c.name == name)?;
        if self.current_context.as_deref() == Some(name) {
            self.current_context = None;
        }
        Some(self.contexts.remove(pos))
    }

    /// Set the current context by name.
    ///
    /// Returns an error if the context doesn't exist.
    pub fn use_context(&mut self, name: &str) -> Result<()> {
        if self.get_context(name).is_some() {
            self.current_context = Some(name.to_string());
            Ok(())
        } else {
            Err(ConfigError::ContextNotFound(name.to_string()))
        }
    }

    /// List all context names.
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }

    /// Request timeout for a context in seconds, applying defaults.
    pub fn effective_timeout(&self, context: &Context) -> u64 {
        context.timeout.unwrap_or(self.defaults.timeout)
    }

    /// Session lifetime for a context in seconds, applying defaults.
    pub fn effective_session_lifetime(&self, context: &Context) -> u64 {
        context
            .session_lifetime
            .unwrap_or(self.defaults.session_lifetime)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// A named connection context (server + credentials bundle).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Context {
    /// Unique name for this context.
    pub name: String,

    /// Full URL of `api_jsonrpc.php`.
    pub server: String,

    /// Login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Where to find the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordSource>,

    /// Accept self-signed or otherwise invalid certificates.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_tls_verify: bool,

    /// Session file override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cache: Option<PathBuf>,

    /// Seconds a cached session stays valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_lifetime: Option<u64>,

    /// Request timeout override (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Context {
    /// Create a new context with just a name and server URL.
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            username: None,
            password: None,
            skip_tls_verify: false,
            session_cache: None,
            session_lifetime: None,
            timeout: None,
        }
    }

    /// Set the login name.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password source.
    pub fn with_password(mut self, password: PasswordSource) -> Self {
        self.password = Some(password);
        self
    }

    /// Disable certificate verification.
    pub fn with_skip_tls_verify(mut self) -> Self {
        self.skip_tls_verify = true;
        self
    }

    /// Set the session file.
    pub fn with_session_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_cache = Some(path.into());
        self
    }

    /// Set the session lifetime.
    pub fn with_session_lifetime(mut self, secs: u64) -> Self {
        self.session_lifetime = Some(secs);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Session file for this context.
    ///
    /// The configured path with `~` expanded, or a file under
    /// `<cache dir>/zbx` keyed by the context name, server and username.
    pub fn session_cache_path(&self) -> Option<PathBuf> {
        match &self.session_cache {
            Some(path) => Some(expand_path(path)),
            None => crate::session_cache_dir().map(|d| {
                d.join(crate::session_file_name(
                    &self.name,
                    &self.server,
                    self.username.as_deref().unwrap_or_default(),
                ))
            }),
        }
    }

    /// Resolve the password for this context.
    pub fn resolve_password(&self) -> Result<String> {
        let missing = || ConfigError::MissingPassword {
            context: self.name.clone(),
        };
        match &self.password {
            Some(source) => source.resolve()?.ok_or_else(missing),
            None => Err(missing()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Password
// ─────────────────────────────────────────────────────────────────────────────

/// Where a context's password comes from.
///
/// Sources are tried in order: file, environment variable, inline value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PasswordSource {
    /// File containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Environment variable containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Plaintext password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl PasswordSource {
    /// Password read from a file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Default::default()
        }
    }

    /// Password read from an environment variable.
    pub fn env(var: impl Into<String>) -> Self {
        Self {
            env: Some(var.into()),
            ..Default::default()
        }
    }

    /// Plaintext password.
    pub fn value(password: impl Into<String>) -> Self {
        Self {
            value: Some(password.into()),
            ..Default::default()
        }
    }

    /// Resolve the actual password.
    pub fn resolve(&self) -> Result<Option<String>> {
        if let Some(path) = &self.file {
            let expanded = expand_path(path);
            if expanded.exists() {
                let password = std::fs::read_to_string(&expanded)
                    .map_err(|e| ConfigError::ReadFile {
                        path: expanded.display().to_string(),
                        source: e,
                    })?
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                return Ok(Some(password));
            }
        }
        if let Some(var) = &self.env
            && let Ok(password) = std::env::var(var)
        {
            return Ok(Some(password));
        }
        Ok(self.value.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default settings applied to all contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientDefaults {
    /// Default request timeout in seconds.
    pub timeout: u64,

    /// Default cached session lifetime in seconds.
    pub session_lifetime: u64,

    /// Whether sessions are cached unless disabled on the command line.
    pub cache_sessions: bool,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            timeout: 30,
            session_lifetime: 4 * 60 * 60,
            cache_sessions: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading / Saving
// ─────────────────────────────────────────────────────────────────────────────

/// Get the path to the client config file.
pub fn client_config_path() -> Option<PathBuf> {
    crate::xdg_config_dir().map(|d| d.join(CLIENT_CONFIG_FILE))
}

/// Load the client configuration.
///
/// Returns a default config if the file doesn't exist.
pub fn load_client_config() -> Result<ClientConfig> {
    load_client_config_from(client_config_path().as_deref())
}

/// Load client config from a specific path.
pub fn load_client_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::new());
    };

    if !path.exists() {
        return Ok(ClientConfig::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    ClientConfig::from_yaml(&contents)
}

/// Save the client configuration.
pub fn save_client_config(config: &ClientConfig) -> Result<()> {
    let path = client_config_path()
        .ok_or_else(|| ConfigError::Other("Could not determine config directory".to_string()))?;
    save_client_config_to(config, &path)
}

/// Save client config to a specific path.
pub fn save_client_config_to(config: &ClientConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_yaml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Expand ~ to home directory in paths.
fn expand_path(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_config() {
        let config = ClientConfig::new();
        assert_eq!(config.api_version, API_VERSION);
        assert_eq!(config.kind, KIND);
        assert!(config.current_context.is_none());
        assert!(config.contexts.is_empty());
        assert!(config.defaults.cache_sessions);
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
api-version: v1
kind: ClientConfig
current-context: lab

contexts:
  - name: prod
    server: https://zabbix.example.com/api_jsonrpc.php
    username: Admin
    password:
      env: ZABBIX_PASSWORD

  - name: lab
    server: https://10.0.0.5/zabbix/api_jsonrpc.php
    username: api-reader
    password:
      file: ~/.config/zbx/lab.pass
    skip-tls-verify: true
    session-cache: /tmp/lab.session
    session-lifetime: 600
    timeout: 5

defaults:
  timeout: 20
  session-lifetime: 3600
"#;
        let config = ClientConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.contexts.len(), 2);

        let prod = config.get_context("prod").unwrap();
        assert_eq!(prod.username.as_deref(), Some("Admin"));
        assert!(!prod.skip_tls_verify);
        assert_eq!(
            prod.password.as_ref().unwrap().env.as_deref(),
            Some("ZABBIX_PASSWORD")
        );
        assert_eq!(config.effective_timeout(prod), 20);
        assert_eq!(config.effective_session_lifetime(prod), 3600);

        let lab = config.current().unwrap();
        assert_eq!(lab.name, "lab");
        assert!(lab.skip_tls_verify);
        assert_eq!(lab.session_cache_path(), Some(PathBuf::from("/tmp/lab.session")));
        assert_eq!(config.effective_timeout(lab), 5);
        assert_eq!(config.effective_session_lifetime(lab), 600);

        // Unspecified defaults keep their built-in value
        assert!(config.defaults.cache_sessions);
    }

    #[test]
    fn test_select_context() {
        let mut config = ClientConfig::new();
        config.set_context(Context::new("a", "http://a/api_jsonrpc.php"));
        config.set_context(Context::new("b", "http://b/api_jsonrpc.php"));

        assert!(config.select(None).unwrap().is_none());

        config.use_context("a").unwrap();
        assert_eq!(config.select(None).unwrap().unwrap().name, "a");
        assert_eq!(config.select(Some("b")).unwrap().unwrap().name, "b");
        assert!(matches!(
            config.select(Some("c")),
            Err(ConfigError::ContextNotFound(_))
        ));
    }

    #[test]
    fn test_set_and_remove_context() {
        let mut config = ClientConfig::new();
        config.set_context(Context::new("prod", "http://old/api_jsonrpc.php"));
        config.set_context(Context::new("prod", "http://new/api_jsonrpc.php"));
        assert_eq!(config.contexts.len(), 1);
        assert_eq!(config.contexts[0].server, "http://new/api_jsonrpc.php");

        config.use_context("prod").unwrap();
        let removed = config.remove_context("prod").unwrap();
        assert_eq!(removed.name, "prod");
        assert!(config.current_context.is_none());
        assert!(config.remove_context("prod").is_none());
    }

    #[test]
    fn test_roundtrip_yaml_omits_unset_fields() {
        let mut config = ClientConfig::new();
        config.set_context(
            Context::new("prod", "https://zabbix.example.com/api_jsonrpc.php")
                .with_username("Admin")
                .with_password(PasswordSource::env("ZABBIX_PASSWORD"))
                .with_timeout(10),
        );
        config.current_context = Some("prod".to_string());

        let yaml = config.to_yaml().unwrap();
        assert!(!yaml.contains("skip-tls-verify"));
        assert!(!yaml.contains("session-cache"));

        let reparsed = ClientConfig::from_yaml(&yaml).unwrap();
        assert_eq!(reparsed.current_context.as_deref(), Some("prod"));
        assert_eq!(reparsed.contexts[0].timeout, Some(10));
        assert_eq!(reparsed.contexts[0].username.as_deref(), Some("Admin"));
    }

    #[test]
    fn test_password_file_wins_over_env_and_value() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("pass");
        std::fs::write(&file, "from-file\n").unwrap();

        let source = PasswordSource {
            file: Some(file),
            env: Some("ZBX_TEST_PASSWORD_UNUSED".to_string()),
            value: Some("inline".to_string()),
        };
        assert_eq!(source.resolve().unwrap().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_password_env_resolve() {
        // SAFETY: env var name is unique to this test
        unsafe {
            std::env::set_var("ZBX_TEST_PASSWORD", "secret123");
        }
        let source = PasswordSource {
            file: Some(PathBuf::from("/nonexistent/zbx.pass")),
            env: Some("ZBX_TEST_PASSWORD".to_string()),
            value: Some("inline".to_string()),
        };
        assert_eq!(source.resolve().unwrap().as_deref(), Some("secret123"));
        // SAFETY: same variable, removed after use
        unsafe {
            std::env::remove_var("ZBX_TEST_PASSWORD");
        }
    }

    #[test]
    fn test_password_value_fallback_and_missing() {
        let context = Context::new("x", "http://x/api_jsonrpc.php")
            .with_password(PasswordSource::value("inline"));
        assert_eq!(context.resolve_password().unwrap(), "inline");

        let context = Context::new("y", "http://y/api_jsonrpc.php");
        assert!(matches!(
            context.resolve_password(),
            Err(ConfigError::MissingPassword { .. })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/client.yaml");

        let mut config = ClientConfig::new();
        config.set_context(Context::new("prod", "https://zabbix.example.com/api_jsonrpc.php"));
        save_client_config_to(&config, &path).unwrap();

        let loaded = load_client_config_from(Some(&path)).unwrap();
        assert_eq!(loaded.context_names(), vec!["prod"]);

        let missing = load_client_config_from(Some(&temp.path().join("absent.yaml"))).unwrap();
        assert!(missing.contexts.is_empty());
    }

    #[test]
    fn test_default_session_cache_path_uses_context_name() {
        let context = Context::new("prod", "http://x/api_jsonrpc.php").with_username("Admin");
        if let Some(path) = context.session_cache_path() {
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(name.starts_with("prod-"));
            assert!(path.parent().unwrap().ends_with("zbx"));
        }
    }

    #[test]
    fn test_default_session_cache_path_follows_server_and_user() {
        let before = Context::new("prod", "http://old/api_jsonrpc.php").with_username("Admin");
        let moved = Context::new("prod", "http://new/api_jsonrpc.php").with_username("Admin");
        let other_user = Context::new("prod", "http://old/api_jsonrpc.php").with_username("ops");

        if let Some(path) = before.session_cache_path() {
            assert_ne!(Some(path.clone()), moved.session_cache_path());
            assert_ne!(Some(path), other_user.session_cache_path());
        }
    }

    #[test]
    fn test_expand_path() {
        let path = PathBuf::from("~/zbx/lab.pass");
        let expanded = expand_path(&path);
        if dirs::home_dir().is_some() {
            assert!(!expanded.to_str().unwrap().starts_with("~/"));
        }

        let path2 = PathBuf::from("/absolute/path");
        assert_eq!(expand_path(&path2), path2);
    }
}
