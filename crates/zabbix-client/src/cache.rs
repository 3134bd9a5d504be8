//! Session caches.
//!
//! A cache lets [`ClientBuilder::connect`](crate::ClientBuilder::connect)
//! reuse a previously established session instead of logging in again.
//! Any storage medium can be plugged in by implementing [`SessionCache`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::session::{CachedSession, Session};

/// Default session file name, relative to the working directory.
pub const SESSION_FILE: &str = ".zabbix_session";

/// Default lifetime of a cached session (4 hours).
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(4 * 60 * 60);

// ============================================================================
// SessionCache Trait
// ============================================================================

/// Storage for a previously established [`Session`].
#[async_trait]
pub trait SessionCache: Send + Sync + std::fmt::Debug {
    /// Whether the cache believes it holds a usable session.
    fn has_session(&self) -> bool;

    /// Load the cached session.
    async fn get_session(&self) -> Result<Session>;

    /// Store a session, replacing any previous one.
    async fn save_session(&self, session: &Session) -> Result<()>;

    /// Forget the cached session.
    async fn clear_session(&self) -> Result<()>;
}

/// Shared session cache for use across async contexts.
pub type SharedSessionCache = Arc<dyn SessionCache>;

// ============================================================================
// FileSessionCache
// ============================================================================

/// Session cache backed by a JSON file.
///
/// The file is only readable by its owner on Unix. A cached session older
/// than the configured lifetime is treated as absent.
#[derive(Debug)]
pub struct FileSessionCache {
    path: PathBuf,
    lifetime: Duration,
}

impl FileSessionCache {
    /// Cache in [`SESSION_FILE`] in the current directory.
    pub fn new() -> Self {
        Self::with_path(PathBuf::from(SESSION_FILE))
    }

    /// Cache in [`SESSION_FILE`] inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::with_path(dir.join(SESSION_FILE))
    }

    /// Cache at a custom file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            lifetime: DEFAULT_SESSION_LIFETIME,
        }
    }

    /// Set how long a cached session stays valid.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Get the session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the configured session lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Check if a record has outlived `lifetime`.
    pub fn is_expired(record: &CachedSession, lifetime: Duration) -> bool {
        let age = (Utc::now() - record.created_at)
            .to_std()
            .unwrap_or_default();
        age >= lifetime
    }

    fn parse(&self, content: &str) -> Result<CachedSession> {
        serde_json::from_str(content).map_err(|e| {
            Error::Cache(format!(
                "Failed to parse session file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Default for FileSessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionCache for FileSessionCache {
    fn has_session(&self) -> bool {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return false;
        };
        match self.parse(&content) {
            Ok(record) => !Self::is_expired(&record, self.lifetime),
            Err(_) => false,
        }
    }

    async fn get_session(&self) -> Result<Session> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Cache(format!(
                "Failed to read session file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let record = self.parse(&content)?;
        if Self::is_expired(&record, self.lifetime) {
            return Err(Error::Cache(format!(
                "Cached session in {} has expired",
                self.path.display()
            )));
        }

        Session::from_cached(record)
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Cache(format!("Failed to create session directory: {}", e))
            })?;
        }

        let json = serde_json::to_vec_pretty(&session.to_cached())?;
        let write_err =
            |e: std::io::Error| Error::Cache(format!("Failed to write session file: {}", e));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(write_err)?;

        // `mode` only applies on creation; tighten an existing file before the token lands in it.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_err)?;
        }

        file.write_all(&json).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;

        tracing::info!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!("Session file {} removed", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Cache(format!(
                "Failed to delete session file: {}",
                e
            ))),
        }
    }
}

// ============================================================================
// InMemorySessionCache
// ============================================================================

/// In-memory session cache, lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    session: RwLock<Option<Session>>,
    save_count: AtomicU32,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            save_count: AtomicU32::new(0),
        }
    }

    /// Number of successful `save_session` calls.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    fn has_session(&self) -> bool {
        self.session
            .try_read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    async fn get_session(&self) -> Result<Session> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Cache("No session cached in memory".to_string()))
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let mut cache = self.session.write().await;
        *cache = Some(session.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        let mut cache = self.session.write().await;
        *cache = None;
        Ok(())
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Create a shared file-based session cache.
pub fn create_file_cache(path: PathBuf, lifetime: Duration) -> SharedSessionCache {
    Arc::new(FileSessionCache::with_path(path).with_lifetime(lifetime))
}

/// Create a shared in-memory session cache.
pub fn create_memory_cache() -> SharedSessionCache {
    Arc::new(InMemorySessionCache::new())
}
