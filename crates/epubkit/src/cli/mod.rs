//! Command-line interface for epubkit.
//!
//! This module provides the CLI structure for the `epubkit` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{CatCommand, CheckCommand, ConfigCommand, InfoCommand, ListMode, LsCommand};

/// epubkit - Inspect and check EPUB publications
///
/// Reads the OCF container and package documents of an EPUB file, lists and
/// extracts its resources, and checks it against the core conformance rules.
#[derive(Debug, Parser)]
#[command(name = "epubkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show package metadata for every rendition
    Info(InfoCommand),

    /// Check a publication for conformance problems
    Check(CheckCommand),

    /// List archive entries, manifest items or the spine
    Ls(LsCommand),

    /// Write an archive entry or manifest item to stdout
    Cat(CatCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "epubkit");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["epubkit", "-q", "info", "a.epub"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["epubkit", "info", "a.epub"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["epubkit", "-v", "info", "a.epub"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["epubkit", "-vv", "info", "a.epub"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_info_with_format() {
        let cli = parse(&["epubkit", "info", "book.epub", "-f", "json"]);
        match cli.command {
            Command::Info(cmd) => {
                assert_eq!(cmd.file, PathBuf::from("book.epub"));
                assert_eq!(cmd.format, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_strict() {
        let cli = parse(&["epubkit", "check", "--strict", "book.epub"]);
        assert!(matches!(cli.command, Command::Check(CheckCommand { strict: true, .. })));
    }

    #[test]
    fn test_parse_ls_modes() {
        let cli = parse(&["epubkit", "ls", "--spine", "book.epub"]);
        match cli.command {
            Command::Ls(cmd) => assert_eq!(cmd.mode(), ListMode::Spine),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_ls_manifest_conflicts_with_spine() {
        let result = Cli::try_parse_from(["epubkit", "ls", "--manifest", "--spine", "book.epub"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_cat_by_id() {
        let cli = parse(&["epubkit", "cat", "book.epub", "chapter1", "--id"]);
        match cli.command {
            Command::Cat(cmd) => {
                assert_eq!(cmd.entry, "chapter1");
                assert!(cmd.id);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["epubkit", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_missing_file_argument_is_rejected() {
        assert!(Cli::try_parse_from(["epubkit", "info"]).is_err());
    }
}
