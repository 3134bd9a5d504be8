//! Call command - invoke an arbitrary API method.

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

/// Arguments for the call command.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// API method, e.g. host.get
    pub method: String,

    /// Method parameters as JSON (default: {})
    pub params: Option<String>,
}

/// Run the call command.
pub async fn run(args: CallArgs, ctx: &Context) -> Result<()> {
    let params: serde_json::Value = match &args.params {
        Some(raw) => serde_json::from_str(raw).context("Parameters must be valid JSON")?,
        None => serde_json::json!({}),
    };

    let (_target, session) = ctx.connect().await?;
    let result: serde_json::Value = session
        .call(&args.method, params)
        .await
        .with_context(|| format!("{} failed", args.method))?;

    if ctx.json_output {
        println!("{}", result);
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}
