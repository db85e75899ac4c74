//! Pipeline recovery service.
//!
//! ```text
//!   alarm / direct call
//!          │
//!          ▼
//!   ┌──────────────┐     ┌───────────────────┐     ┌─────────────────────┐
//!   │ http /invoke │────▶│ InvocationHandler │────▶│  RecoveryExecutor   │
//!   └──────────────┘     └─────────┬─────────┘     │  breaker → history  │
//!                                  │               │  classify → plan    │
//!                                  ▼               │  scale/cleanup/probe│
//!                          NotificationSink        │  audit              │
//!                                                  └─────────────────────┘
//! ```
//!
//! `serve` (default) runs the HTTP service; `invoke` handles one event from a
//! file or stdin and prints the response.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use pipeline_recovery::config::watcher::ConfigWatcher;
use pipeline_recovery::config::{load_config, loader::load_from_env, RecoveryConfig};
use pipeline_recovery::http::{AppState, HttpServer};
use pipeline_recovery::invocation::InvocationHandler;
use pipeline_recovery::lifecycle::{build_collaborators, wait_for_shutdown_signal, Shutdown};
use pipeline_recovery::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "pipeline-recovery", version)]
#[command(about = "Automated recovery for CI/CD pipeline failures", long_about = None)]
struct Cli {
    /// TOML configuration file. Without it, defaults plus environment overrides apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve,
    /// Handle a single event and print the response
    Invoke {
        /// Event JSON file; stdin when omitted
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pipeline-recovery starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, cli.config).await,
        Command::Invoke { event } => invoke_once(config, event).await,
    }
}

async fn serve(
    config: RecoveryConfig,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let deps = build_collaborators(&config).await?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        repository = %config.github.repository(),
        circuit_breaker_enabled = config.circuit_breaker.enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(AppState::new(config, InvocationHandler::new(deps)));

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            server.spawn_config_updates(updates, shutdown.subscribe());
            Some(watcher.run()?)
        }
        None => None,
    };

    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = wait_for_shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn invoke_once(
    config: RecoveryConfig,
    event_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = match event_path {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let event: serde_json::Value = serde_json::from_str(&raw)?;

    let deps = build_collaborators(&config).await?;
    let handler = InvocationHandler::new(deps);
    let response = handler.handle(Arc::new(config), &event).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.status_code >= 400 {
        std::process::exit(1);
    }
    Ok(())
}
