use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "recovery-cli")]
#[command(about = "Management CLI for the pipeline recovery service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// List circuit breaker states
    Circuits,
    /// Trigger a recovery run
    Invoke {
        /// Failure type, e.g. pipeline_failure or build_failure
        #[arg(short, long, default_value = "manual_recovery")]
        failure_type: String,

        /// JSON object passed as the recovery context
        #[arg(short, long)]
        context: Option<String>,

        /// Send this event file verbatim instead
        #[arg(short, long, conflicts_with_all = ["failure_type", "context"])]
        event: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Circuits => {
            let res = client.get(format!("{}/circuits", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Invoke {
            failure_type,
            context,
            event,
        } => {
            let body: Value = match event {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                None => {
                    let context: Value = match context {
                        Some(raw) => serde_json::from_str(&raw)?,
                        None => serde_json::json!({}),
                    };
                    serde_json::json!({ "failure_type": failure_type, "context": context })
                }
            };
            let res = client.post(format!("{}/invoke", base)).json(&body).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(text);

    if status.is_success() {
        println!("{}", pretty);
    } else {
        eprintln!("Error: service returned status {}", status);
        eprintln!("{}", pretty);
    }
    Ok(())
}
