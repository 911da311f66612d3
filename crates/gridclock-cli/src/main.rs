//! gridclock CLI - drive the control core without hardware.
//!
//! `gclk run` plays a virtual clock through a session and prints which rows
//! fired on every tick. `gclk preset` inspects the JSON preset store.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod config;

use commands::{config as config_cmd, preset, run};
use config::Config;

/// gridclock CLI - simulate the clock divider and manage presets.
#[derive(Parser, Debug)]
#[command(
    name = "gclk",
    author,
    version,
    about = "gridclock: simulate a logic clock divider and manage its presets",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a session on a virtual clock and print the gate timeline.
    Run {
        /// Number of clock ticks to simulate.
        #[arg(short, long, default_value_t = 16)]
        ticks: u64,

        /// Logic edge to apply before running, as SRC:OP:DST (e.g. 3:and:2).
        /// Can be specified multiple times; edits apply in order.
        #[arg(short, long)]
        edge: Vec<String>,

        /// Division column for a row, as ROW:POS with POS in 4..=15.
        #[arg(short, long)]
        position: Vec<String>,

        /// Logic depth: single or nested.
        #[arg(long, default_value = "single")]
        depth: String,

        /// Rotate row divisions every K ticks.
        #[arg(long)]
        rotate_every: Option<u64>,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Inspect and initialize stored presets.
    #[command(subcommand)]
    Preset(PresetCommands),

    /// Show CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Preset store commands.
#[derive(Subcommand, Debug)]
enum PresetCommands {
    /// List written slots.
    List {
        /// Store root (defaults to the configured store directory).
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Print the preset in a slot as JSON.
    Show {
        /// Slot number, 0..=9.
        slot: u8,

        /// Store root (defaults to the configured store directory).
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Write factory defaults to slot 0 and make it active.
    Init {
        /// Store root (defaults to the configured store directory).
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Show path to config file.
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Run {
            ticks,
            edge,
            position,
            depth,
            rotate_every,
            format,
        } => {
            let options = run::RunOptions {
                ticks,
                edges: edge
                    .iter()
                    .map(|s| s.parse())
                    .collect::<Result<Vec<_>>>()?,
                positions: position
                    .iter()
                    .map(|s| s.parse())
                    .collect::<Result<Vec<_>>>()?,
                depth: run::parse_depth(&depth)?,
                rotate_every,
            };
            let format: run::OutputFormat = format.parse()?;
            run::execute(&config, &options, format)?;
        }

        Commands::Preset(preset_cmd) => match preset_cmd {
            PresetCommands::List { store } => {
                preset::list(&store.unwrap_or_else(|| config.store_dir.clone()))?;
            }
            PresetCommands::Show { slot, store } => {
                preset::show(&store.unwrap_or_else(|| config.store_dir.clone()), slot)?;
            }
            PresetCommands::Init { store } => {
                preset::init(&store.unwrap_or_else(|| config.store_dir.clone()))?;
            }
        },

        Commands::Config(config_cmd_inner) => match config_cmd_inner {
            ConfigCommands::Show => {
                config_cmd::show(&config)?;
            }
            ConfigCommands::Path => {
                if let Some(path) = Config::config_file_path() {
                    println!("{}", path.display());
                } else {
                    println!("(no config file path available)");
                }
            }
        },
    }

    Ok(())
}
