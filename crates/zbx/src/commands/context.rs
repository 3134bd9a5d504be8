//! Context command - manage named connection contexts.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use zabbix_config::{PasswordSource, save_client_config_to};

use super::Context;

/// Arguments for the context command.
#[derive(Args, Debug)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub command: ContextCommand,
}

#[derive(Subcommand, Debug)]
pub enum ContextCommand {
    /// List all contexts
    List,

    /// Show the current context
    Current,

    /// Switch the current context
    Use {
        /// Context name
        name: String,
    },

    /// Create or replace a context
    Set(SetArgs),

    /// Delete a context
    Remove {
        /// Context name
        name: String,
    },
}

/// Arguments for `context set`.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Context name
    pub name: String,

    /// API endpoint URL
    #[arg(long = "url")]
    pub url: String,

    /// Login name
    #[arg(long)]
    pub username: Option<String>,

    /// Environment variable holding the password
    #[arg(long)]
    pub password_env: Option<String>,

    /// File holding the password
    #[arg(long)]
    pub password_file: Option<PathBuf>,

    /// Skip TLS certificate verification for this context
    #[arg(long)]
    pub skip_tls_verify: bool,

    /// Session file for this context
    #[arg(long)]
    pub session_cache: Option<PathBuf>,

    /// Seconds a cached session stays valid
    #[arg(long)]
    pub session_lifetime: Option<u64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Make this the current context
    #[arg(long)]
    pub activate: bool,
}

/// Run the context command.
pub async fn run(args: ContextArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ContextCommand::List => cmd_list(ctx),
        ContextCommand::Current => cmd_current(ctx),
        ContextCommand::Use { name } => cmd_use(&name, ctx),
        ContextCommand::Set(set) => cmd_set(set, ctx),
        ContextCommand::Remove { name } => cmd_remove(&name, ctx),
    }
}

fn cmd_list(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let current = config.current_context.as_deref();

    if ctx.json_output {
        let contexts: Vec<_> = config
            .contexts
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "server": c.server,
                    "username": c.username,
                    "current": Some(c.name.as_str()) == current,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&contexts)?);
        return Ok(());
    }

    if config.contexts.is_empty() {
        println!("No contexts configured. Add one with 'zbx context set'.");
        return Ok(());
    }

    for c in &config.contexts {
        let marker = if Some(c.name.as_str()) == current { "*" } else { " " };
        println!("{} {:<16} {}", marker, c.name, c.server);
    }
    Ok(())
}

fn cmd_current(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    match config.current() {
        Some(c) => println!("{}", c.name),
        None => println!("No current context set."),
    }
    Ok(())
}

fn cmd_use(name: &str, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;
    config.use_context(name)?;
    save_client_config_to(&config, &ctx.config_file()?)?;
    println!("Switched to context '{}'.", name);
    Ok(())
}

fn cmd_set(args: SetArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;

    let mut context = zabbix_config::Context::new(&args.name, &args.url);
    if let Some(username) = args.username {
        context = context.with_username(username);
    }
    if args.password_env.is_some() || args.password_file.is_some() {
        context = context.with_password(PasswordSource {
            file: args.password_file,
            env: args.password_env,
            value: None,
        });
    }
    if args.skip_tls_verify {
        context = context.with_skip_tls_verify();
    }
    if let Some(path) = args.session_cache {
        context = context.with_session_cache(path);
    }
    if let Some(secs) = args.session_lifetime {
        context = context.with_session_lifetime(secs);
    }
    if let Some(secs) = args.timeout {
        context = context.with_timeout(secs);
    }

    config.set_context(context);
    if args.activate || config.current_context.is_none() {
        config.use_context(&args.name)?;
    }

    save_client_config_to(&config, &ctx.config_file()?)?;
    println!("Context '{}' saved.", args.name);
    Ok(())
}

fn cmd_remove(name: &str, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;
    config
        .remove_context(name)
        .ok_or_else(|| anyhow!("Context '{}' not found", name))?;
    save_client_config_to(&config, &ctx.config_file()?)?;
    println!("Context '{}' removed.", name);
    Ok(())
}
