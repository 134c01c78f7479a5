// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Metaweave CLI - keeps generated inter-type declarations in step with their governors

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use metaweave::commands::{self, GlobalOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metaweave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "METAWEAVE_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(short, long, global = true)]
    root: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the project once and bring every ITD up to date
    Generate,

    /// Regenerate ITDs as source files change
    Watch,

    /// Show dependency, cache and file counters after a scan
    Status,

    /// Export the metadata dependency graph
    Graph {
        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Take a metadata identifier apart
    Id {
        /// Identifier, e.g. MID:com.example.Provider#SRC_MAIN_JAVA?com.example.Bar
        id: String,
    },

    /// Inspect configuration
    Config {
        /// Action: show, path
        #[arg(default_value = "show")]
        action: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = GlobalOptions {
        root: cli.root.clone(),
        config: cli.config.clone(),
        json: cli.json,
        no_color: cli.no_color,
    };

    init_logging(&cli, &options);

    match cli.command {
        Commands::Generate => commands::generate::run(&options),
        Commands::Watch => commands::watch::run(&options),
        Commands::Status => commands::status::run(&options),
        Commands::Graph { format, output } => commands::graph::run(&options, &format, output),
        Commands::Id { id } => commands::id::run(&options, &id),
        Commands::Config { action } => commands::config::run(&options, &action),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}

/// `RUST_LOG` wins, then -v/-q, then the configured level
fn init_logging(cli: &Cli, options: &GlobalOptions) {
    let level = match cli.verbose {
        0 if cli.quiet => "error".to_string(),
        0 => options
            .load_config()
            .map_or_else(|_| "info".to_string(), |config| config.log_level),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
