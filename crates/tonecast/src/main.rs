//! Tonecast CLI - turn a photograph into an editor preset.
//!
//! Tonecast asks vision LLMs which adjustments would recreate the look of a
//! photograph and writes the answer as a Camera Raw settings sidecar.
//!
//! # Usage
//!
//! ```bash
//! # Analyze an image and write a preset
//! tonecast analyze photo.jpg --output photo.xmp
//!
//! # Print the full analysis report instead
//! tonecast analyze photo.jpg --json --providers openai,anthropic
//!
//! # Encode a hand-written profile
//! tonecast encode profile.json > preset.xmp
//!
//! # View configuration
//! tonecast config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Tonecast - photograph to editor preset with vision LLMs.
#[derive(Parser, Debug)]
#[command(name = "tonecast")]
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
    /// Analyze an image and produce a preset sidecar
    Analyze(cli::analyze::AnalyzeArgs),

    /// Encode an adjustment profile (JSON) as a preset sidecar
    Encode(cli::encode::EncodeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match tonecast_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tonecast config path`."
            );
            tonecast_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Tonecast v{}", tonecast_core::VERSION);

    match cli.command {
        Commands::Analyze(args) => cli::analyze::execute(args, config).await,
        Commands::Encode(args) => cli::encode::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
