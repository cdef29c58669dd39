//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Name to advertise (overrides the configuration)
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start interactive chat
    Chat,
    /// Send a single message and exit once it is delivered
    Send {
        /// Message text
        message: String,
        /// Give up after this many seconds
        #[arg(short, long, default_value_t = 60)]
        timeout: u64,
    },
    /// Scan and list nearby devices
    Peers {
        /// Scan duration in seconds
        #[arg(short, long, default_value_t = 10)]
        duration: u64,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Run two sessions over an in-memory radio and print the transcript
    Demo,
}
