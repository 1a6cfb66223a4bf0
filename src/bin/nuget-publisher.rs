//! NuGet Publisher CLI
//!
//! Runs the NuGet release plugin outside a release host

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nuget_publisher::{
    ConfigLoader, ExecuteRequest, Hook, NuGetPlugin, Plugin, RawConfig, ReleaseContext,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Publish .NET packages to NuGet as part of a release
#[derive(Parser)]
#[command(name = "nuget-publisher")]
#[command(version)]
#[command(about = "Publish packages to NuGet (.NET)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the plugin for a release hook
    Execute {
        /// Hook name (e.g. post-publish)
        #[arg(long, value_parser = parse_hook, default_value = "post-publish")]
        hook: Hook,

        /// Config file (YAML, TOML or JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Release version
        #[arg(long, default_value = "")]
        version: String,

        /// Previous release version
        #[arg(long)]
        previous_version: Option<String>,

        /// Release tag name
        #[arg(long)]
        tag: Option<String>,

        /// Report what would be pushed without pushing
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a config file without pushing anything
    Validate {
        /// Config file (YAML, TOML or JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Display plugin metadata
    Info,
}

fn parse_hook(value: &str) -> Result<Hook, String> {
    Hook::parse(value).ok_or_else(|| {
        let known: Vec<&str> = Hook::all().iter().map(|h| h.as_str()).collect();
        format!("unknown hook '{}' (expected one of: {})", value, known.join(", "))
    })
}

#[tokio::main]
async fn main() {
    init_tracing();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Console logging on stderr, controlled by RUST_LOG (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let plugin = NuGetPlugin::new();

    match cli.command {
        Commands::Execute {
            hook,
            config,
            version,
            previous_version,
            tag,
            dry_run,
        } => {
            let request = ExecuteRequest {
                hook,
                config: load_config(config.as_deref()).await?,
                context: ReleaseContext {
                    version,
                    previous_version,
                    tag_name: tag,
                    ..Default::default()
                },
                dry_run,
            };

            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());

            let response = plugin.execute(request, cancel).await?;
            print_json(&response)?;
            Ok(if response.success { 0 } else { 1 })
        }

        Commands::Validate { config } => {
            let raw = load_config(config.as_deref()).await?;
            let response = plugin.validate(&raw).await?;
            print_json(&response)?;
            Ok(if response.valid { 0 } else { 1 })
        }

        Commands::Info => {
            print_json(&plugin.info())?;
            Ok(0)
        }
    }
}

async fn load_config(path: Option<&Path>) -> Result<RawConfig> {
    let Some(path) = path else {
        return Ok(RawConfig::new());
    };

    let env: HashMap<String, String> = std::env::vars().collect();
    ConfigLoader::load_file(path, &env)
        .await
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Cancel in-flight pushes on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling push");
            cancel.cancel();
        }
    });
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
