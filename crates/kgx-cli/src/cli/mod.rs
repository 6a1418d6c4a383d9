//! CLI entry and dispatch.

use std::io::{IsTerminal, stdout};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kgx_core::config::Config;
use tokio::runtime::Runtime;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "kgx")]
#[command(version)]
#[command(about = "Compare traditional SQL and knowledge-graph answers side by side")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run a search and stream both answers
    Search {
        /// Natural-language question
        #[arg(value_name = "QUERY")]
        query: String,

        /// Maximum rows per panel (1-500)
        #[arg(long, value_name = "N")]
        max_results: Option<u32>,

        /// Milliseconds per revealed character
        #[arg(long, value_name = "MS")]
        speed: Option<u64>,

        /// Print to stdout instead of the full-screen view
        #[arg(long)]
        plain: bool,
    },
    /// Format a JSON array as a table
    Format {
        /// Use the graph layout (labels, properties, relationships)
        #[arg(long)]
        graph: bool,

        /// Input file (reads stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Check whether the backend is up
    Health,
    /// Show backend system information
    Info,
    /// List the backend's sample queries
    Samples,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

impl Commands {
    fn wants_tui(&self) -> bool {
        matches!(self, Commands::Search { plain: false, .. })
            && cfg!(feature = "tui")
            && stdout().is_terminal()
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // config commands must work even when the file is broken
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = Config::load().context("load config")?;
    let tui = cli.command.wants_tui();
    let _log_guard = logging::init(&config.logging, tui);

    // one tokio runtime for everything
    let rt = Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli.command, config, tui).await })
}

async fn dispatch(command: Commands, mut config: Config, tui: bool) -> Result<()> {
    match command {
        Commands::Search {
            query,
            max_results,
            speed,
            plain: _,
        } => {
            if let Some(ms) = speed {
                config.reveal = config.reveal.with_speed_ms(ms);
            }
            let request = commands::search::build_request(&query, max_results, &config)?;
            if tui {
                commands::search::run_tui(&config, request).await
            } else {
                commands::search::run_plain(&config, request).await
            }
        }
        Commands::Format { graph, file } => commands::format::run(graph, file.as_deref(), &config),
        Commands::Health => commands::backend::health(&config).await,
        Commands::Info => commands::backend::info(&config).await,
        Commands::Samples => commands::backend::samples(&config).await,
        // handled before the config file is loaded
        Commands::Config { .. } => Ok(()),
    }
}
