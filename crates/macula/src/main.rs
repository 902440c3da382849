//! Macula CLI - AMD fundus stage classification service.
//!
//! Macula serves a pretrained three-stage AMD classifier over HTTP:
//! uploads are decoded, preprocessed with the exact training-time
//! transform (bilinear 300×300 resize + CLAHE + custom standardization)
//! and classified with an ONNX export of the trained ResNet50.
//!
//! # Usage
//!
//! ```bash
//! # Run the HTTP service
//! macula serve --port 5000
//!
//! # Classify a single file offline
//! macula classify fundus.jpg --pretty
//!
//! # View configuration
//! macula config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;
mod server;

/// Macula - AMD fundus stage classification service.
#[derive(Parser, Debug)]
#[command(name = "macula")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP classification service
    Serve(cli::serve::ServeArgs),

    /// Classify a single image file and print the result as JSON
    Classify(cli::classify::ClassifyArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match macula_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `macula config path`."
            );
            macula_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Macula v{}", macula_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Classify(args) => cli::classify::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config).await,
    }
}
