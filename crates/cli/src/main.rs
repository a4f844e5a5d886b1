//! SkillWatch CLI, the main entry point.
//!
//! Commands:
//! - `replay`: Replay a recorded skill lifecycle through the instrumentation
//! - `status`: Show resolved configuration and serverless detection

use clap::{Parser, Subcommand};
use skillwatch_config::AppConfig;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "skillwatch",
    about = "SkillWatch: error reporting for conversational skill lifecycles",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded lifecycle script and print the captured reports
    Replay {
        /// Path to the JSON script
        script: PathBuf,

        /// Override the configured backend client ("memory" or "log")
        #[arg(short, long)]
        client: Option<String>,
    },

    /// Show resolved configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Initialize tracing
    let filter = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Replay { script, client } => commands::replay::run(&config, &script, client).await?,
        Commands::Status => commands::status::run(&config).await?,
    }

    Ok(())
}
