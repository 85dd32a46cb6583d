//! Mapping driver: applies a mapping table to a source directory.
//!
//! For every entry of the table both patterns are resolved against the
//! template bindings, matching sources are located under the source root, the
//! destination is built under the destination root and the configured action
//! is executed. Entries are independent; a failing entry is recorded in the
//! report and the run moves on.

use crate::config::ConfigError;
use crate::file_action::{Action, ActionError, ActionExecutor, ActionOutcome};
use crate::mapping::{MappingEntry, MappingTable};
use crate::output::OutputFormatter;
use crate::path_builder::{self, PathBuilder, PathConstructionError};
use crate::report::{EntryRecord, EntryStatus, MappingReport};
use crate::template::{TemplateBindings, TemplateError, TemplateResolver};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed to run one mapping.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Path to the JSON mapping file.
    pub json_file: PathBuf,
    /// Directory that source patterns are resolved against.
    pub source_root: PathBuf,
    /// Directory under which destination patterns are created.
    pub dest_root: PathBuf,
    /// Comma separated `key=value` bindings.
    pub template: String,
    pub action: Action,
    /// Report actions without touching the filesystem.
    pub dry_run: bool,
    /// Replace destinations that existed before the run.
    pub overwrite: bool,
    /// Show a progress bar over the entries.
    pub progress: bool,
}

impl MapOptions {
    pub fn new(
        json_file: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
        template: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            json_file: json_file.into(),
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            template: template.into(),
            action,
            dry_run: false,
            overwrite: false,
            progress: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

/// Per-entry failures. None of these abort a run.
#[derive(Debug)]
pub enum EntryError {
    /// A pattern referenced a placeholder without a binding.
    Template(TemplateError),
    /// The resolved source pattern is not a valid glob.
    InvalidSourcePattern { pattern: String, reason: String },
    /// The resolved source pattern is absolute or climbs out of the source root.
    SourceOutsideRoot { pattern: String },
    /// The destination path could not be built.
    Path(PathConstructionError),
    /// The source was missing or the action failed.
    Action(ActionError),
}

impl EntryError {
    /// How the entry is counted in the summary.
    pub fn status(&self) -> EntryStatus {
        match self {
            EntryError::Template(_)
            | EntryError::InvalidSourcePattern { .. }
            | EntryError::SourceOutsideRoot { .. }
            | EntryError::Action(ActionError::SourceNotFound { .. }) => EntryStatus::Skipped,
            EntryError::Path(_) | EntryError::Action(ActionError::ActionFailed { .. }) => {
                EntryStatus::Failed
            }
        }
    }
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryError::Template(e) => write!(f, "{}", e),
            EntryError::InvalidSourcePattern { pattern, reason } => {
                write!(f, "Invalid source pattern '{}': {}", pattern, reason)
            }
            EntryError::SourceOutsideRoot { pattern } => {
                write!(f, "Source '{}' is not inside the source root", pattern)
            }
            EntryError::Path(e) => write!(f, "{}", e),
            EntryError::Action(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EntryError {}

impl From<TemplateError> for EntryError {
    fn from(e: TemplateError) -> Self {
        EntryError::Template(e)
    }
}

impl From<PathConstructionError> for EntryError {
    fn from(e: PathConstructionError) -> Self {
        EntryError::Path(e)
    }
}

impl From<ActionError> for EntryError {
    fn from(e: ActionError) -> Self {
        EntryError::Action(e)
    }
}

/// Loads the mapping file and template string, then maps every entry.
///
/// # Errors
///
/// Returns a `ConfigError`, before any file is touched, when the mapping
/// file or template string is malformed, the source root is not a directory,
/// or the destination root cannot be used. Per-entry problems are reported in
/// the returned `MappingReport` instead.
///
/// # Examples
///
/// ```no_run
/// use filemapper::file_action::Action;
/// use filemapper::mapper::{MapOptions, process_json_file};
/// use filemapper::output::OutputFormatter;
///
/// let options = MapOptions::new(
///     "template.json",
///     "raw",
///     "bids",
///     "subject=sub-01,pipeline=smooth,session=baseline",
///     Action::Symlink,
/// );
/// let report = process_json_file(&options, &OutputFormatter::new(false)).unwrap();
/// println!("{} entries processed", report.records.len());
/// ```
pub fn process_json_file(
    options: &MapOptions,
    output: &OutputFormatter,
) -> Result<MappingReport, ConfigError> {
    let table = MappingTable::load(&options.json_file)?;
    let bindings = TemplateBindings::parse(&options.template)?;
    prepare_roots(options)?;

    Ok(map_entries(&table, bindings, options, output))
}

/// Checks the source root and creates the destination root if needed.
fn prepare_roots(options: &MapOptions) -> Result<(), ConfigError> {
    if !options.source_root.is_dir() {
        return Err(ConfigError::InvalidSourceRoot(options.source_root.clone()));
    }

    let dest = &options.dest_root;
    if dest.exists() {
        if !dest.is_dir() {
            return Err(ConfigError::InvalidDestinationRoot {
                path: dest.clone(),
                reason: "not a directory".to_string(),
            });
        }
    } else if !options.dry_run {
        fs::create_dir_all(dest).map_err(|e| ConfigError::InvalidDestinationRoot {
            path: dest.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

/// Maps every entry of an already loaded table.
///
/// Roots are not validated here; see [`process_json_file`].
pub fn map_entries(
    table: &MappingTable,
    bindings: TemplateBindings,
    options: &MapOptions,
    output: &OutputFormatter,
) -> MappingReport {
    let executor = ActionExecutor::new(options.action, options.dry_run, output)
        .with_overwrite(options.overwrite);
    let mut mapper = FileMapper {
        resolver: TemplateResolver::new(bindings),
        source_root: &options.source_root,
        path_builder: PathBuilder::new(&options.dest_root, options.dry_run),
        executor,
        output,
        produced: HashSet::new(),
    };
    mapper.run(table, options.progress)
}

/// State of one mapping run.
struct FileMapper<'a> {
    resolver: TemplateResolver,
    source_root: &'a Path,
    path_builder: PathBuilder,
    executor: ActionExecutor<'a>,
    output: &'a OutputFormatter,
    /// Destinations written so far, for collision warnings.
    produced: HashSet<PathBuf>,
}

impl FileMapper<'_> {
    fn run(&mut self, table: &MappingTable, show_progress: bool) -> MappingReport {
        let mut report = MappingReport::new(
            self.executor.action(),
            self.executor.is_dry_run(),
            table.len(),
        );

        if self.executor.is_dry_run() {
            self.output.dry_run_notice(&format!(
                "Previewing {} of {} into {}",
                self.executor.action(),
                self.source_root.display(),
                self.path_builder.root().display()
            ));
        } else {
            self.output.info(&format!(
                "Mapping {} into {} ({})",
                self.source_root.display(),
                self.path_builder.root().display(),
                self.executor.action()
            ));
        }

        if table.is_empty() {
            self.output.warning("Mapping file contains no entries");
        }
        self.note_unused_bindings(table);

        let pb = self
            .output
            .create_progress_bar(table.len() as u64, show_progress);

        for entry in table.entries() {
            pb.set_message(entry.source_pattern.clone());
            self.process_entry(entry, &pb, &mut report);
            pb.inc(1);
        }
        pb.finish_and_clear();

        report
    }

    fn process_entry(
        &mut self,
        entry: &MappingEntry,
        pb: &ProgressBar,
        report: &mut MappingReport,
    ) {
        let resolved = self
            .resolve_patterns(entry)
            .and_then(|(source, dest)| Ok((self.locate_sources(&source)?, dest)));

        let (sources, resolved_dest) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                pb.suspend(|| {
                    self.output
                        .warning(&format!("Skipped '{}': {}", entry.source_pattern, e))
                });
                report.push(EntryRecord {
                    source_pattern: entry.source_pattern.clone(),
                    dest_pattern: entry.dest_pattern.clone(),
                    source: None,
                    destination: None,
                    status: e.status(),
                    message: Some(e.to_string()),
                });
                return;
            }
        };

        let into_directory = resolved_dest.ends_with('/') || sources.len() > 1;

        for source in sources {
            let relative = if into_directory {
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match resolved_dest.trim_end_matches('/') {
                    "" => name,
                    dir => format!("{}/{}", dir, name),
                }
            } else {
                resolved_dest.clone()
            };

            let record = pb.suspend(|| self.process_source(entry, source, &relative));
            report.push(record);
        }
    }

    fn resolve_patterns(&self, entry: &MappingEntry) -> Result<(String, String), EntryError> {
        let source = self.resolver.resolve(&entry.source_pattern)?;
        let dest = self.resolver.resolve(&entry.dest_pattern)?;
        Ok((source, dest))
    }

    /// Finds the source paths a resolved pattern refers to.
    ///
    /// An existing file named exactly like the pattern wins over glob
    /// expansion, so `scan[1].nii` is found as written. Other literal patterns
    /// yield one path, which may not exist; the executor reports that. Glob
    /// patterns yield every match, sorted.
    fn locate_sources(&self, resolved: &str) -> Result<Vec<PathBuf>, EntryError> {
        if !path_builder::stays_inside(resolved) {
            return Err(EntryError::SourceOutsideRoot {
                pattern: resolved.to_string(),
            });
        }

        let literal = self.source_root.join(resolved);
        if !resolved.contains(['*', '?', '[']) || fs::symlink_metadata(&literal).is_ok() {
            return Ok(vec![literal]);
        }

        let escaped_root = glob::Pattern::escape(&self.source_root.to_string_lossy());
        let pattern = Path::new(&escaped_root).join(resolved);
        let pattern = pattern.to_string_lossy();

        let paths = glob::glob(&pattern).map_err(|e| EntryError::InvalidSourcePattern {
            pattern: resolved.to_string(),
            reason: e.to_string(),
        })?;

        let mut matches: Vec<PathBuf> = paths.flatten().collect();
        matches.sort();

        if matches.is_empty() {
            return Err(ActionError::SourceNotFound { path: literal }.into());
        }
        Ok(matches)
    }

    fn process_source(
        &mut self,
        entry: &MappingEntry,
        source: PathBuf,
        relative: &str,
    ) -> EntryRecord {
        let mut record = EntryRecord {
            source_pattern: entry.source_pattern.clone(),
            dest_pattern: entry.dest_pattern.clone(),
            source: Some(source.clone()),
            destination: None,
            status: EntryStatus::Succeeded,
            message: None,
        };

        let destination = match self.path_builder.build(relative) {
            Ok(path) => path,
            Err(e) => {
                let e = EntryError::from(e);
                self.output.error(&format!("{}: {}", source.display(), e));
                record.status = e.status();
                record.message = Some(e.to_string());
                return record;
            }
        };
        record.destination = Some(destination.clone());

        let collision = self.produced.contains(&destination);
        let result = if collision {
            let warning = format!(
                "{} was already produced by an earlier entry; last write wins",
                destination.display()
            );
            self.output.warning(&warning);
            record.message = Some(warning);
            self.executor.execute_replacing(&source, &destination)
        } else {
            self.executor.execute(&source, &destination)
        };

        match result {
            Ok(outcome) => {
                self.produced.insert(destination.clone());
                if outcome == ActionOutcome::Planned {
                    record.status = EntryStatus::Planned;
                } else {
                    self.output.success(&format!(
                        "{} {} -> {}",
                        self.executor.action().past_tense(),
                        source.display(),
                        destination.display()
                    ));
                }
            }
            Err(e) => {
                let e = EntryError::from(e);
                let status = e.status();
                if status == EntryStatus::Skipped {
                    self.output.warning(&format!("Skipped: {}", e));
                } else {
                    self.output.error(&e.to_string());
                }
                record.status = status;
                record.message = Some(e.to_string());
            }
        }

        record
    }

    /// Mentions bindings that no pattern refers to. They are harmless.
    fn note_unused_bindings(&self, table: &MappingTable) {
        let referenced: HashSet<String> = table
            .entries()
            .iter()
            .flat_map(|e| {
                TemplateResolver::placeholders(&e.source_pattern)
                    .into_iter()
                    .chain(TemplateResolver::placeholders(&e.dest_pattern))
            })
            .collect();

        for (name, _) in self.resolver.bindings().iter() {
            if !referenced.contains(name) {
                self.output
                    .info(&format!("Binding '{}' is not used by any pattern", name));
            }
        }
    }
}
