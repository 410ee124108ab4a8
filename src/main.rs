// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Main entry point for the Aegis MCP security mediator
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use aegis::config::{Config, ConfigHandle, MediationConfig};
use aegis::engine_core::audit::{CorruptStorePolicy, JsonFileAuditStore};
use aegis::engine_core::constants;
use aegis::engine_core::mediator::MediationEngine;
use aegis::mcp::McpServer;
use aegis::report;

#[derive(Parser, Debug)]
#[command(name = "aegis", version, about = "Security mediator for MCP agents", long_about = None)]
struct Cli {
    /// Mediation config file (JSON, or YAML by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Audit log store (JSON array)
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    /// Log filter, e.g. "info" or "aegis=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: "text" or "json"
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// What to do with an unreadable audit log: "quarantine" or "overwrite"
    #[arg(long, global = true)]
    corrupt_log_policy: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the mediation tools over MCP stdio (default)
    Serve,
    /// Print the audit report
    Report {
        /// Redraw the report until interrupted
        #[arg(long)]
        watch: bool,

        /// Refresh interval in seconds for --watch
        #[arg(long, default_value_t = constants::report::DEFAULT_REFRESH_SECS)]
        interval: u64,

        /// Disable colours
        #[arg(long)]
        no_color: bool,
    },
    /// Validate the mediation config and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    install_panic_hook();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config from env, using defaults: {}", e);
        Config::default()
    });

    // CLI flags override environment
    if let Some(p) = cli.config {
        config.config_path = p;
    }
    if let Some(p) = cli.audit_log {
        config.audit_log_path = p;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(policy) = cli.corrupt_log_policy {
        config.corrupt_log_policy = CorruptStorePolicy::parse_safe(&policy);
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await?,
        Command::Report {
            watch,
            interval,
            no_color,
        } => {
            let colored = !no_color && std::io::stdout().is_terminal();
            show_report(&config, watch, interval, colored).await;
        }
        Command::CheckConfig => {
            let effective = MediationConfig::load(&config.config_path)?;
            println!("{}", serde_json::to_string_pretty(&effective)?);
        }
    }

    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        "Starting Aegis v{} (config: {}, audit log: {})",
        env!("CARGO_PKG_VERSION"),
        config.config_path.display(),
        config.audit_log_path.display()
    );

    let handle = Arc::new(ConfigHandle::from_file(&config.config_path));
    // Dropping the watcher stops reloads, so it lives as long as the server.
    let _watcher = handle.spawn_watcher().unwrap_or_else(|e| {
        warn!("Config hot reload disabled: {}", e);
        None
    });

    let store = JsonFileAuditStore::open(&config.audit_log_path, config.corrupt_log_policy)
        .with_context(|| format!("cannot open audit log {}", config.audit_log_path.display()))?;

    let engine = MediationEngine::with_default_oracles(handle, Arc::new(store));
    McpServer::new(Arc::new(engine)).run_stdio().await
}

async fn show_report(config: &Config, watch: bool, interval: u64, colored: bool) {
    let store = JsonFileAuditStore::reader(&config.audit_log_path);

    if !watch {
        print!("{}", report::render_store(&store, colored));
        return;
    }

    let every = Duration::from_secs(interval.max(1));
    loop {
        // Clear screen and home the cursor before each redraw
        print!("\x1B[2J\x1B[H{}", report::render_store(&store, colored));
        tokio::select! {
            _ = tokio::time::sleep(every) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, leaving watch mode.");
                break;
            }
        }
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("aegis=debug,info"));

    // stdout carries JSON-RPC; logs go to stderr only
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(())
}
