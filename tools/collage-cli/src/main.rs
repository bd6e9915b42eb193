//! Collage CLI: command-line host for the three-video collage compositor.
//!
//! Usage:
//!   collage export <TOP> <MIDDLE> <BOTTOM>   Export a collage and save it to the library
//!   collage plan <TOP> <MIDDLE> <BOTTOM>     Show the timeline and slot placements
//!   collage probe <PATH>...                  Ingest files and report the outcome per file
//!   collage check                            Check encoder tools and configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use collage_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "collage",
    about = "Stack three videos into one vertical collage",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a collage and save it to the library
    Export {
        /// Video for the top slot
        top: PathBuf,

        /// Video for the middle slot
        middle: PathBuf,

        /// Video for the bottom slot
        bottom: PathBuf,

        /// Library directory (overrides config)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Directory for the temporary export file (overrides config)
        #[arg(long)]
        temp_dir: Option<PathBuf>,
    },

    /// Show the collage timeline and slot placements without encoding
    Plan {
        /// Video for the top slot
        top: PathBuf,

        /// Video for the middle slot
        middle: PathBuf,

        /// Video for the bottom slot
        bottom: PathBuf,

        /// Print the timeline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ingest files and report the outcome per file
    Probe {
        /// Files to probe
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Check encoder tools and configuration
    Check {
        /// Write the effective configuration if no config file exists yet
        #[arg(long)]
        init_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    collage_common::logging::init_logging(&config.logging);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Using default configuration");
    }

    match cli.command {
        Commands::Export {
            top,
            middle,
            bottom,
            library,
            temp_dir,
        } => {
            if let Some(library) = library {
                config.library_dir = library;
            }
            if let Some(temp_dir) = temp_dir {
                config.export.temp_dir = temp_dir;
            }
            commands::export::run(&config, vec![top, middle, bottom]).await
        }
        Commands::Plan {
            top,
            middle,
            bottom,
            json,
        } => commands::plan::run(&config, vec![top, middle, bottom], json).await,
        Commands::Probe { paths } => commands::probe::run(&config, paths).await,
        Commands::Check { init_config } => commands::check::run(&config, init_config),
    }
}
