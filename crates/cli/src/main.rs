//! quillmind CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  : Write the default config
//! - `apply`    : Apply reflection operations to a work's playbook
//! - `recall`   : Render relevant bullets for prompt injection
//! - `show`     : Curator view of the whole playbook
//! - `feedback` : Record helpful/harmful tags
//! - `reset`    : Empty a work's playbook
//! - `stats`    : Per-section counts

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "quillmind",
    about = "quillmind — evolving playbook memory for AI writing assistants",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.quillmind/config.toml
    #[arg(long, global = true, env = "QUILLMIND_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Apply ADD operations (JSON) to a work's playbook
    Apply {
        /// Work id
        #[arg(short, long)]
        work: String,

        /// JSON file with operations; reads stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Select and render bullets for a prompt
    Recall {
        #[arg(short, long)]
        work: String,

        /// Query text; empty means most recent first
        #[arg(short, long, default_value = "")]
        query: String,

        /// Token budget for the rendered text
        #[arg(short, long)]
        budget: Option<usize>,

        /// Maximum bullets to select
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the bullets shown as JSON instead of the text
        #[arg(long)]
        json: bool,
    },

    /// Show the whole playbook with usage counters
    Show {
        #[arg(short, long)]
        work: String,

        #[arg(short, long)]
        budget: Option<usize>,
    },

    /// Record feedback tags (JSON) for shown bullets
    Feedback {
        #[arg(short, long)]
        work: String,

        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Replace a work's playbook with an empty one
    Reset {
        #[arg(short, long)]
        work: String,

        /// Confirm the reset
        #[arg(long)]
        confirm: bool,
    },

    /// Per-section bullet and counter totals
    Stats {
        #[arg(short, long)]
        work: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Onboard = cli.command {
        return commands::onboard::run().await;
    }

    let config = commands::load_config(cli.config.as_deref())?;
    let service = commands::build_service(&config).await?;

    match cli.command {
        Commands::Onboard => {}
        Commands::Apply { work, file } => {
            commands::playbook::apply(&service, &work, file.as_deref()).await?
        }
        Commands::Recall {
            work,
            query,
            budget,
            top_k,
            json,
        } => commands::playbook::recall(&service, &work, &query, top_k, budget, json).await?,
        Commands::Show { work, budget } => commands::playbook::show(&service, &work, budget).await?,
        Commands::Feedback { work, file } => {
            commands::playbook::feedback(&service, &work, file.as_deref()).await?
        }
        Commands::Reset { work, confirm } => {
            commands::playbook::reset(&service, &work, confirm).await?
        }
        Commands::Stats { work } => commands::playbook::stats(&service, &work).await?,
    }

    service.flush().await;
    Ok(())
}
