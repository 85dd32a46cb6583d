//! Command-line interface module for filemapper.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging flags with the TOML configuration
//! - Running the mapping and printing the summary
//! - Writing the optional JSON run report

use crate::config::{ConfigError, MapperConfig};
use crate::file_action::Action;
use crate::mapper::{MapOptions, process_json_file};
use crate::output::OutputFormatter;
use crate::report::MappingReport;
use clap::Parser;
use std::path::PathBuf;

/// Rearrange a flat dataset into a templated directory tree.
#[derive(Debug, Clone, Parser)]
#[command(name = "filemapper", version, about)]
pub struct Cli {
    /// JSON file mapping source patterns to destination patterns
    pub json_file: PathBuf,

    /// Directory the source patterns are resolved against
    pub sourcepath: PathBuf,

    /// Directory under which destination patterns are created
    pub destpath: PathBuf,

    /// Placeholder bindings, e.g. "subject=sub-01,session=baseline"
    #[arg(short, long)]
    pub template: String,

    /// How each destination is realized
    #[arg(short, long, value_enum)]
    pub action: Action,

    /// Only report what would be done; touch nothing
    #[arg(long, visible_alias = "dry-run")]
    pub testdebug: bool,

    /// Replace destinations that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Exit with status 2 if any entry is skipped or fails
    #[arg(long)]
    pub strict: bool,

    /// Write a JSON report of every entry to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Configuration file (defaults to .filemapperrc.toml or ~/.config/filemapper/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Only print warnings, errors and the summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// How a completed run should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every entry succeeded, or failures are tolerated.
    Completed,
    /// Strict mode and at least one entry was skipped or failed.
    EntriesFailed,
}

/// Runs the CLI application with parsed arguments.
///
/// Flags are merged with the configuration file: a flag given on the command
/// line always turns its setting on.
///
/// # Errors
///
/// Returns a `ConfigError` when the configuration, mapping file, template
/// string or roots are unusable. Nothing is mutated in that case.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use filemapper::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from([
///     "filemapper", "template.json", "raw", "bids",
///     "--template", "subject=sub-01", "--action", "symlink",
/// ]);
/// match run_cli(&cli) {
///     Ok(status) => println!("{:?}", status),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunStatus, ConfigError> {
    let config = MapperConfig::load(cli.config.as_deref())?;

    if cli.no_color || !config.output.color {
        OutputFormatter::set_color(false);
    }
    let output = OutputFormatter::new(cli.quiet || config.output.quiet);

    let options = MapOptions::new(
        &cli.json_file,
        &cli.sourcepath,
        &cli.destpath,
        cli.template.clone(),
        cli.action,
    )
    .dry_run(cli.testdebug)
    .overwrite(cli.overwrite || config.mapping.overwrite)
    .progress(cli.progress || config.output.progress);

    let report = process_json_file(&options, &output)?;
    finish(&report, cli, &output);

    let strict = cli.strict || config.mapping.strict;
    Ok(if strict && !report.is_complete_success() {
        RunStatus::EntriesFailed
    } else {
        RunStatus::Completed
    })
}

/// Prints the summary and writes the report file if one was requested.
fn finish(report: &MappingReport, cli: &Cli, output: &OutputFormatter) {
    output.summary_table(report);

    let problems: Vec<_> = report.problems().collect();
    if !problems.is_empty() {
        output.header("Entries needing attention:");
        for record in problems {
            let what = record
                .source
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| record.source_pattern.clone());
            output.warning(&format!(
                "{}: {}",
                what,
                record.message.as_deref().unwrap_or(record.status.label())
            ));
        }
    }

    if let Some(path) = &cli.report {
        match report.save(path) {
            Ok(()) => output.info(&format!("Report written to {}", path.display())),
            Err(e) => output.error(&format!(
                "Could not write report {}: {}",
                path.display(),
                e
            )),
        }
    }

    if report.dry_run {
        output.success("Dry run complete. No files were modified.");
        output.plain("Run again without --testdebug to apply the mapping.");
    }
}
