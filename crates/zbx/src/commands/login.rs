//! Login command - establish or reuse a session.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Print the session token
    #[arg(long)]
    pub show_token: bool,
}

/// Run the login command.
pub async fn run(args: LoginArgs, ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let cached = target.has_cached_session();
    let session = target.connect().await?;

    if ctx.json_output {
        let mut output = serde_json::json!({
            "url": session.url().as_str(),
            "version": session.version().to_string(),
            "cached": cached,
            "created_at": session.created_at().to_rfc3339(),
        });
        if args.show_token {
            output["token"] = serde_json::Value::from(session.token());
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if cached {
        println!("Reusing cached session for {}", session.url());
    } else {
        println!("Logged in to {}", session.url());
    }
    println!("  API version: {}", session.version());
    println!("  Created:     {}", session.created_at().format("%Y-%m-%d %H:%M:%S UTC"));
    if args.show_token {
        println!("  Token:       {}", session.token());
    }

    Ok(())
}
