//! zbx - Zabbix API from the command line
//!
//! Main entry point for the zbx CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{call, context, login, logout, version};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// zbx - Zabbix API client with cached sessions
#[derive(Parser)]
#[command(name = "zbx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Client config file (default: ~/.config/zbx/client.yaml)
    #[arg(long, global = true, env = "ZBX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Context to use instead of the current one
    #[arg(long = "context", global = true)]
    pub context_name: Option<String>,

    /// API endpoint URL, e.g. https://zabbix.example.com/api_jsonrpc.php
    #[arg(long, global = true, env = "ZBX_SERVER")]
    pub server: Option<String>,

    /// Login name
    #[arg(long, global = true, env = "ZBX_USER")]
    pub user: Option<String>,

    /// Login password
    #[arg(long, global = true, env = "ZBX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Always log in instead of reusing a cached session
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in (or reuse a cached session) and show session details
    Login(login::LoginArgs),

    /// Show the server API version
    Version(version::VersionArgs),

    /// Call an API method and print the result
    Call(call::CallArgs),

    /// Log out and forget the cached session
    Logout(logout::LogoutArgs),

    /// Manage connection contexts
    Context(context::ContextArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "zbx=debug,zabbix_client=debug,zabbix_config=debug,info"
    } else {
        "zbx=info,zabbix_client=info,warn"
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(cli.verbose)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let ctx = commands::Context {
        config_path: cli.config,
        context_name: cli.context_name,
        server: cli.server,
        user: cli.user,
        password: cli.password,
        insecure: cli.insecure,
        no_cache: cli.no_cache,
        json_output: cli.json,
    };

    match cli.command {
        Commands::Login(args) => login::run(args, &ctx).await,
        Commands::Version(args) => version::run(args, &ctx).await,
        Commands::Call(args) => call::run(args, &ctx).await,
        Commands::Logout(args) => logout::run(args, &ctx).await,
        Commands::Context(args) => context::run(args, &ctx).await,
    }
}
