//! Zabbix JSON-RPC API client with cached sessions.
//!
//! Build a client with [`create_client`], then [`ClientBuilder::connect`]
//! to obtain an authenticated [`Session`]. When a [`SessionCache`] is
//! configured, a previously saved session is reused and no login is made.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zabbix_client::{Error, FileSessionCache, Result, create_client};
//!
//! # async fn example() -> Result<()> {
//! let builder = create_client("https://zabbix.example.com/api_jsonrpc.php")
//!     .with_credentials("Admin", "zabbix")
//!     .with_cache(Arc::new(FileSessionCache::new()));
//!
//! let session = match builder.connect().await {
//!     Ok(session) => session,
//!     // Logged in, but the session file could not be written
//!     Err(e @ Error::CacheSave { .. }) => e.into_session().unwrap(),
//!     Err(e) => return Err(e),
//! };
//!
//! let hosts: serde_json::Value = session
//!     .call("host.get", serde_json::json!({ "output": ["host"] }))
//!     .await?;
//! println!("{}", hosts);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod rpc;
pub mod session;

pub use cache::{
    FileSessionCache, InMemorySessionCache, SessionCache, SharedSessionCache, create_file_cache,
    create_memory_cache,
};
pub use client::{ClientBuilder, Credentials, create_client};
pub use error::{Error, Result};
pub use rpc::ApiVersion;
pub use session::{CachedSession, Session, Transport, server_version};
