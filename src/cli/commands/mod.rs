//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod import;
mod init;
mod list;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "jlingest")]
#[command(about = "Import hotel reviews from JL exports into a relational store")]
#[command(version)]
pub struct Cli {
    /// Config file (default: auto-discover jlingest.{toml,yaml,json})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths against the working directory instead of the config file
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Run one import over the configured source and wait for it
    Import,

    /// Show items that would be picked up, without claiming them
    List,

    /// Start the HTTP trigger (and the timer trigger when enabled)
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:3030)
        #[arg(default_value = "127.0.0.1:3030")]
        bind: String,

        /// Do not start the timer trigger even if enabled in config
        #[arg(long)]
        no_schedule: bool,
    },
}

/// Parse arguments, load settings and run the chosen command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (settings, _config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Import => import::cmd_import(&settings).await,
        Commands::List => list::cmd_list(&settings).await,
        Commands::Serve { bind, no_schedule } => {
            serve::cmd_serve(&settings, &bind, no_schedule).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["jlingest", "serve", "8080", "-v", "--config", "x.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Commands::Serve { ref bind, no_schedule: false } if bind == "8080"
        ));
    }
}
