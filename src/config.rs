//! Configuration module.
//!
//! This module defines the command-line interface (CLI) for the inspector using `clap`.

use clap::Parser;
use std::path::PathBuf;

/// Inspect the pipeline symbols and metadata of a GPU pipeline ELF image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Pipeline ELF image
    pub input: PathBuf,

    /// Generic symbols to look up by exact name
    #[arg(short, long = "symbol", value_name = "NAME")]
    pub symbols: Vec<String>,

    /// Decode and print the pipeline metadata
    #[arg(short, long)]
    pub metadata: bool,

    /// Print metadata as JSON
    #[arg(long, requires = "metadata")]
    pub json: bool,

    /// Treat missing .text or .note sections as errors
    #[arg(long)]
    pub strict: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}
