//! Version command - query the server API version.

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

/// Arguments for the version command.
#[derive(Args, Debug)]
pub struct VersionArgs {}

/// Run the version command.
///
/// `apiinfo.version` needs no credentials, so no login is made.
pub async fn run(_args: VersionArgs, ctx: &Context) -> Result<()> {
    let (server, transport) = ctx.endpoint()?;
    let version = zabbix_client::server_version(&server, &transport)
        .await
        .with_context(|| format!("Failed to query {}", server))?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::json!({ "url": server, "version": version.to_string() })
        );
    } else {
        println!("{}", version);
    }

    Ok(())
}
