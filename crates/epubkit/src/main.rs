//! `epubkit` - CLI for inspecting and checking EPUB publications
//!
//! This binary provides the command-line interface over the epubkit library.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use epubkit::check::{check_file, Report};
use epubkit::cli::{
    CatCommand, CheckCommand, Cli, Command, ConfigCommand, InfoCommand, ListMode, LsCommand,
};
use epubkit::config::OutputFormat;
use epubkit::package::{Dir, PackageDocument};
use epubkit::reader::EpubReader;
use epubkit::{init_logging, Config};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)
}

fn run(cli: Cli, out: &mut impl Write) -> Result<ExitCode> {
    let config_path = cli.config.unwrap_or_else(Config::default_config_path);
    let load = || Config::load_from(Some(config_path.clone()));

    // Config commands run without loading, so a broken file can be inspected
    match cli.command {
        Command::Info(cmd) => handle_info(&load()?, &cmd, out),
        Command::Check(cmd) => handle_check(&load()?, &cmd, out),
        Command::Ls(cmd) => handle_ls(&load()?, &cmd, out),
        Command::Cat(cmd) => handle_cat(&load()?, &cmd, out),
        Command::Config(cmd) => handle_config(&config_path, cmd, out),
    }
}

fn output_format(config: &Config, requested: Option<OutputFormat>) -> OutputFormat {
    requested.unwrap_or(config.output.format)
}

fn open(path: &Path) -> Result<EpubReader<io::BufReader<std::fs::File>>> {
    EpubReader::open(path).with_context(|| format!("cannot read {}", path.display()))
}

#[derive(Debug, Serialize)]
struct PackageSummary<'a> {
    path: &'a str,
    version: &'a str,
    unique_identifier: Option<&'a str>,
    titles: &'a [String],
    languages: &'a [String],
    creators: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dir: Option<Dir>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_image: Option<&'a str>,
    manifest_items: usize,
    spine_items: usize,
}

impl<'a> From<&'a PackageDocument> for PackageSummary<'a> {
    fn from(package: &'a PackageDocument) -> Self {
        Self {
            path: &package.path,
            version: &package.version,
            unique_identifier: package.unique_identifier_value(),
            titles: &package.metadata.titles,
            languages: &package.metadata.languages,
            creators: &package.metadata.creators,
            dir: package.dir(),
            modified: package.metadata.modified.as_deref(),
            cover_image: package.cover_image().map(|item| item.href.as_str()),
            manifest_items: package.manifest.len(),
            spine_items: package.spine.itemrefs.len(),
        }
    }
}

fn handle_info(config: &Config, cmd: &InfoCommand, out: &mut impl Write) -> Result<ExitCode> {
    let reader = open(&cmd.file)?;
    reader.require_package_document()?;

    let summaries: Vec<PackageSummary<'_>> = reader
        .package_documents()
        .iter()
        .map(PackageSummary::from)
        .collect();

    match output_format(config, cmd.format) {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &summaries)?;
            writeln!(out)?;
        }
        OutputFormat::Plain => {
            for (index, summary) in summaries.iter().enumerate() {
                if index > 0 {
                    writeln!(out)?;
                }
                writeln!(out, "Package:       {}", summary.path)?;
                writeln!(out, "Version:       {}", summary.version)?;
                writeln!(
                    out,
                    "Identifier:    {}",
                    summary.unique_identifier.unwrap_or("(unresolved)")
                )?;
                writeln!(out, "Title:         {}", summary.titles.join("; "))?;
                writeln!(out, "Language:      {}", summary.languages.join(", "))?;
                writeln!(out, "Creators:      {}", summary.creators.join("; "))?;
                if let Some(dir) = summary.dir {
                    writeln!(out, "Direction:     {dir:?}")?;
                }
                if let Some(modified) = summary.modified {
                    writeln!(out, "Modified:      {modified}")?;
                }
                if let Some(cover) = summary.cover_image {
                    writeln!(out, "Cover image:   {cover}")?;
                }
                writeln!(out, "Manifest:      {} items", summary.manifest_items)?;
                writeln!(out, "Spine:         {} items", summary.spine_items)?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_check(config: &Config, cmd: &CheckCommand, out: &mut impl Write) -> Result<ExitCode> {
    let mut options = config.check_options();
    if cmd.strict {
        options.strict_media_types = true;
    }

    let report = check_file(&cmd.file, &options);
    info!("Checked {}: {}", cmd.file.display(), report.summary());

    write_report(&report, output_format(config, cmd.format), out)?;

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn write_report(report: &Report, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Plain => {
            for finding in &report.findings {
                writeln!(out, "{finding}")?;
            }
            writeln!(out, "{}", report.summary())?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SpineRow<'a> {
    idref: &'a str,
    linear: bool,
    href: Option<&'a str>,
}

fn handle_ls(config: &Config, cmd: &LsCommand, out: &mut impl Write) -> Result<ExitCode> {
    let mut reader = open(&cmd.file)?;
    let format = output_format(config, cmd.format);

    match cmd.mode() {
        ListMode::Entries => {
            let entries = reader.entries()?;
            match format {
                OutputFormat::Json => serde_json::to_writer_pretty(&mut *out, &entries)?,
                OutputFormat::Plain => {
                    for entry in &entries {
                        let method = if entry.stored { "stored" } else { "deflated" };
                        writeln!(out, "{:>10}  {method:<8}  {}", entry.size, entry.name)?;
                    }
                }
            }
        }
        ListMode::Manifest => {
            let package = reader.require_package_document()?;
            match format {
                OutputFormat::Json => serde_json::to_writer_pretty(&mut *out, &package.manifest)?,
                OutputFormat::Plain => {
                    for item in &package.manifest {
                        writeln!(out, "{}\t{}\t{}", item.id, item.media_type, item.href)?;
                    }
                }
            }
        }
        ListMode::Spine => {
            let package = reader.require_package_document()?;
            let rows: Vec<SpineRow<'_>> = package
                .spine
                .itemrefs
                .iter()
                .map(|itemref| SpineRow {
                    idref: &itemref.idref,
                    linear: itemref.linear,
                    href: package
                        .manifest
                        .get(&itemref.idref)
                        .map(|item| item.href.as_str()),
                })
                .collect();
            match format {
                OutputFormat::Json => serde_json::to_writer_pretty(&mut *out, &rows)?,
                OutputFormat::Plain => {
                    for (index, row) in rows.iter().enumerate() {
                        let marker = if row.linear { "" } else { " (non-linear)" };
                        writeln!(
                            out,
                            "{:>3}  {}  {}{marker}",
                            index + 1,
                            row.idref,
                            row.href.unwrap_or("?")
                        )?;
                    }
                }
            }
        }
    }

    if format == OutputFormat::Json {
        writeln!(out)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_cat(config: &Config, cmd: &CatCommand, out: &mut impl Write) -> Result<ExitCode> {
    let mut reader = open(&cmd.file)?;
    let name = if cmd.id {
        reader.manifest_item_path(&cmd.entry)?
    } else {
        cmd.entry.clone()
    };

    let content = reader.read_entry_limited(&name, config.limits.max_entry_bytes)?;
    out.write_all(&content)?;
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn handle_config(config_path: &Path, cmd: ConfigCommand, out: &mut impl Write) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(Some(config_path.to_path_buf()))?;
            if json {
                serde_json::to_writer_pretty(&mut *out, &config)?;
                writeln!(out)?;
            } else {
                writeln!(out, "Current Configuration")?;
                writeln!(out, "=====================")?;
                writeln!(out)?;
                writeln!(out, "[check]")?;
                writeln!(
                    out,
                    "  Strict media types:      {}",
                    config.check.strict_media_types
                )?;
                writeln!(
                    out,
                    "  Require stored mimetype: {}",
                    config.check.require_stored_mimetype
                )?;
                writeln!(out)?;
                writeln!(out, "[output]")?;
                writeln!(out, "  Format:                  {:?}", config.output.format)?;
                writeln!(out)?;
                writeln!(out, "[limits]")?;
                writeln!(
                    out,
                    "  Max entry bytes:         {}",
                    config.limits.max_entry_bytes
                )?;
            }
        }
        ConfigCommand::Path => {
            writeln!(out, "{}", config_path.display())?;
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(|| config_path.to_path_buf());
            writeln!(out, "Validating configuration: {}", path.display())?;
            match Config::load_from(Some(path)) {
                Ok(_) => writeln!(out, "Configuration is valid.")?,
                Err(e) => {
                    writeln!(out, "Configuration error: {e}")?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod common;
