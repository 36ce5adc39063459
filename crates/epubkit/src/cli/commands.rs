//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::OutputFormat;

/// Info command arguments.
#[derive(Debug, Args)]
pub struct InfoCommand {
    /// Path to the EPUB file
    pub file: PathBuf,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Path to the EPUB file
    pub file: PathBuf,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Treat media-type mismatches as errors
    #[arg(long)]
    pub strict: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct LsCommand {
    /// Path to the EPUB file
    pub file: PathBuf,

    /// List manifest items instead of archive entries
    #[arg(short, long, conflicts_with = "spine")]
    pub manifest: bool,

    /// List the spine in reading order
    #[arg(short, long)]
    pub spine: bool,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// What `ls` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Archive entries.
    Entries,
    /// Manifest items.
    Manifest,
    /// Spine itemrefs.
    Spine,
}

impl LsCommand {
    /// The listing selected by the flags.
    #[must_use]
    pub fn mode(&self) -> ListMode {
        if self.manifest {
            ListMode::Manifest
        } else if self.spine {
            ListMode::Spine
        } else {
            ListMode::Entries
        }
    }
}

/// Cat command arguments.
#[derive(Debug, Args)]
pub struct CatCommand {
    /// Path to the EPUB file
    pub file: PathBuf,

    /// Archive path of the entry, or a manifest id with `--id`
    pub entry: String,

    /// Treat ENTRY as a manifest item id
    #[arg(long)]
    pub id: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
