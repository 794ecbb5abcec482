//! Binary entry point for csvbundle.
//!
//! This binary inspects and extracts CSV bundle archives.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use csvbundle::cli::{ConfigCommand, ExtractCommand, InspectCommand};
use csvbundle::config::BundleConfig;
use csvbundle::observability::{self, LoggingConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Environment variable naming a config file when `--config` is absent.
const CONFIG_PATH_ENV_VAR: &str = "CSVBUNDLE_CONFIG_PATH";

/// csvbundle - Typed record collections as a zip of CSV files.
#[derive(Parser)]
#[command(name = "csvbundle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List an archive's entries with their headers and row counts.
    Inspect {
        /// The archive to inspect.
        archive: PathBuf,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Extract an archive inside a sandboxed directory.
    Extract {
        /// The archive to extract.
        archive: PathBuf,

        /// Target directory (default: the configured extraction directory).
        #[arg(short, long)]
        into: Option<PathBuf>,
    },

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: BundleConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Inspect { archive, json } => {
            InspectCommand::new().run(&archive, json, &mut stdout)?;
        },

        Commands::Extract { archive, into } => {
            let into = into.unwrap_or_else(|| config.extraction_dir.clone());
            ExtractCommand::new(into).run(&archive, &mut stdout)?;
        },

        Commands::Config { show } => {
            ConfigCommand::new().run(&config, show, &mut stdout)?;
        },
    }

    Ok(())
}

/// Loads configuration from file or default.
fn load_config(path: Option<&str>) -> Result<BundleConfig, Box<dyn std::error::Error>> {
    // If a path is provided, load from that file
    if let Some(config_path) = path {
        return BundleConfig::load_from_file(std::path::Path::new(config_path))
            .map_err(std::convert::Into::into);
    }

    // Environment override for config path
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV_VAR) {
        if !config_path.trim().is_empty() {
            return BundleConfig::load_from_file(std::path::Path::new(&config_path))
                .map_err(std::convert::Into::into);
        }
    }

    // Otherwise, load from default location
    Ok(BundleConfig::load_default())
}
