//! Logout command - end the session on the server and clear the cache.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Only delete the cached session, keep it valid on the server
    #[arg(long)]
    pub local: bool,
}

/// Run the logout command.
pub async fn run(args: LogoutArgs, ctx: &Context) -> Result<()> {
    let target = ctx.target()?;

    if !args.local {
        if !target.has_cached_session() {
            println!("No cached session to log out.");
            return Ok(());
        }
        let session = target.connect().await?;
        if let Err(e) = session.logout().await {
            // Already expired server-side; still clear the local copy
            tracing::warn!("Server logout failed: {}", e);
        }
    }

    if let Some(cache) = &target.cache {
        cache.clear_session().await?;
    }

    println!("Logged out.");
    Ok(())
}
