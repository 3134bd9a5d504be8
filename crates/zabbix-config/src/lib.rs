//! Client configuration for Zabbix API connections.
//!
//! kubeconfig-style YAML with named contexts, each bundling a server URL,
//! credentials, TLS settings and where its session is cached.

pub mod client;
pub mod error;

use std::path::PathBuf;

use sha2::{Digest, Sha256};

pub use client::{
    ClientConfig, ClientDefaults, Context, PasswordSource, client_config_path, load_client_config,
    load_client_config_from, save_client_config, save_client_config_to,
};
pub use error::{ConfigError, Result};

/// Application name for XDG directory resolution.
pub const APP_NAME: &str = "zbx";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "ZBX_CONFIG_DIR";

/// Directory holding `client.yaml`.
///
/// `$ZBX_CONFIG_DIR` when set, otherwise the platform config dir (e.g. `~/.config/zbx`).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Directory holding cached session files (e.g. `~/.cache/zbx`).
pub fn session_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(APP_NAME))
}

/// Session file name for a login on `server` as `username`, starting with `prefix`.
///
/// Distinct servers and users never share a file.
pub fn session_file_name(prefix: &str, server: &str, username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b"@");
    hasher.update(server.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}.session", prefix, &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_file_name_is_stable() {
        let a = session_file_name("default", "https://a/api_jsonrpc.php", "alice");
        assert_eq!(
            a,
            session_file_name("default", "https://a/api_jsonrpc.php", "alice")
        );
        assert!(a.starts_with("default-"));
        assert!(a.ends_with(".session"));
    }

    #[test]
    fn test_session_file_name_differs_per_server_and_user() {
        let base = session_file_name("default", "https://a/api_jsonrpc.php", "alice");
        assert_ne!(
            base,
            session_file_name("default", "https://b/api_jsonrpc.php", "alice")
        );
        assert_ne!(
            base,
            session_file_name("default", "https://a/api_jsonrpc.php", "bob")
        );
    }
}
