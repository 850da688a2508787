//! CLI parse: clap types for dagfs. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dagfs - mutable filesystem over a content-addressed DAG
#[derive(Parser)]
#[command(name = "dagfs")]
#[command(about = "Mutable filesystem over an immutable content-addressed Merkle DAG")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory searched for dagfs.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Block store directory (overrides storage.store_path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create an empty filesystem in the store
    Init,
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents; succeed if the directory exists
        #[arg(short = 'p', long)]
        parents: bool,
    },
    /// Write a file from --file or stdin, replacing its content
    Write {
        path: String,
        /// Read content from this local file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print a file
    Cat { path: String },
    /// Move or rename
    Mv { src: String, dst: String },
    /// Remove a file or directory
    Rm { path: String },
    /// Show node details
    Stat { path: String },
    /// Print the published root hash
    Root,
}
