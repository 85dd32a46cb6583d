/// Realization of a single source/destination pair.
///
/// This module provides the three ways a destination can be materialized
/// (copy, move, symbolic link) and a dry-run mode that only reports what
/// would happen.
use crate::output::OutputFormatter;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The filesystem operation applied to every entry of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Duplicate content and metadata; the source is untouched.
    Copy,
    /// Relocate the source to the destination.
    Move,
    /// Create a symbolic link to the absolute source path.
    Symlink,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Copy => "copy",
            Action::Move => "move",
            Action::Symlink => "symlink",
        }
    }

    /// Past-tense verb used in log lines.
    pub fn past_tense(&self) -> &'static str {
        match self {
            Action::Copy => "Copied",
            Action::Move => "Moved",
            Action::Symlink => "Linked",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while realizing an entry.
#[derive(Debug)]
pub enum ActionError {
    /// The source path does not exist.
    SourceNotFound { path: PathBuf },
    /// The underlying filesystem operation failed.
    ActionFailed {
        action: Action,
        source: PathBuf,
        destination: PathBuf,
        error: std::io::Error,
    },
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceNotFound { path } => {
                write!(f, "Source not found: {}", path.display())
            }
            Self::ActionFailed {
                action,
                source,
                destination,
                error,
            } => {
                write!(
                    f,
                    "Failed to {} {} to {}: {}",
                    action,
                    source.display(),
                    destination.display(),
                    error
                )
            }
        }
    }
}

impl std::error::Error for ActionError {}

/// Result type for action execution.
pub type ActionResult<T> = Result<T, ActionError>;

/// What the executor did for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The destination was realized on disk.
    Performed,
    /// Dry run: the action was only reported.
    Planned,
}

/// Applies one `Action` to source/destination pairs.
#[derive(Debug, Clone)]
pub struct ActionExecutor<'a> {
    action: Action,
    dry_run: bool,
    overwrite: bool,
    output: &'a OutputFormatter,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(action: Action, dry_run: bool, output: &'a OutputFormatter) -> Self {
        Self {
            action,
            dry_run,
            overwrite: false,
            output,
        }
    }

    /// Allow replacing destinations that already exist.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Realizes `destination` from `source`.
    ///
    /// An existing destination is only replaced when the executor was built
    /// with overwrite enabled.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filemapper::file_action::{Action, ActionExecutor};
    /// use filemapper::output::OutputFormatter;
    /// use std::path::Path;
    ///
    /// let output = OutputFormatter::new(false);
    /// let executor = ActionExecutor::new(Action::Symlink, false, &output);
    /// executor
    ///     .execute(Path::new("/data/raw/sub-01.json"), Path::new("/data/bids/sub-01.json"))
    ///     .unwrap();
    /// ```
    pub fn execute(&self, source: &Path, destination: &Path) -> ActionResult<ActionOutcome> {
        self.execute_with(source, destination, self.overwrite)
    }

    /// Like [`execute`](Self::execute) but always replaces an existing destination.
    pub fn execute_replacing(
        &self,
        source: &Path,
        destination: &Path,
    ) -> ActionResult<ActionOutcome> {
        self.execute_with(source, destination, true)
    }

    fn execute_with(
        &self,
        source: &Path,
        destination: &Path,
        replace: bool,
    ) -> ActionResult<ActionOutcome> {
        if !source.exists() {
            return Err(ActionError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        let failed = |error: std::io::Error| ActionError::ActionFailed {
            action: self.action,
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            error,
        };

        // Dangling links count as existing destinations.
        let existing = fs::symlink_metadata(destination).ok();
        if let Some(metadata) = &existing {
            if is_same_location(source, destination) {
                return Err(failed(std::io::Error::new(
                    ErrorKind::InvalidInput,
                    "source and destination are the same file",
                )));
            }
            if !replace {
                return Err(failed(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    "destination already exists",
                )));
            }
            if metadata.is_dir() {
                return Err(failed(std::io::Error::new(
                    ErrorKind::IsADirectory,
                    "refusing to replace an existing directory",
                )));
            }
        }

        if self.dry_run {
            self.output.dry_run_notice(&format!(
                "Would {} {} -> {}{}",
                self.action,
                source.display(),
                destination.display(),
                if existing.is_some() {
                    " (replacing existing)"
                } else {
                    ""
                }
            ));
            return Ok(ActionOutcome::Planned);
        }

        let result = if existing.is_some() {
            self.replace_existing(source, destination)
        } else {
            self.realize(source, destination)
        };
        result.map_err(failed)?;

        Ok(ActionOutcome::Performed)
    }

    fn realize(&self, source: &Path, destination: &Path) -> std::io::Result<()> {
        match self.action {
            Action::Copy => self.copy_path(source, destination),
            Action::Move => self.move_path(source, destination),
            Action::Symlink => link_path(source, destination),
        }
    }

    /// Realizes the new destination next to the old one, then renames it into
    /// place. On failure the old destination is left as it was.
    fn replace_existing(&self, source: &Path, destination: &Path) -> std::io::Result<()> {
        let staging = staging_path(destination);
        if fs::symlink_metadata(&staging).is_ok() {
            self.discard(&staging);
        }

        let result = self
            .realize(source, &staging)
            .and_then(|()| fs::rename(&staging, destination));

        if result.is_err() && fs::symlink_metadata(&staging).is_ok() {
            if self.action == Action::Move {
                if let Err(e) = self.move_path(&staging, source) {
                    self.output.warning(&format!(
                        "Could not restore {} from {}: {}",
                        source.display(),
                        staging.display(),
                        e
                    ));
                }
            } else {
                self.discard(&staging);
            }
        }
        result
    }

    fn discard(&self, path: &Path) {
        let removed = if path.is_dir() && !path.is_symlink() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = removed {
            self.output.warning(&format!(
                "Could not remove leftover {}: {}",
                path.display(),
                e
            ));
        }
    }

    fn move_path(&self, source: &Path, destination: &Path) -> std::io::Result<()> {
        match fs::rename(source, destination) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                self.output.info(&format!(
                    "   {} is on another device, copying then removing the source",
                    destination.display()
                ));
                self.copy_path(source, destination)?;
                if source.is_dir() {
                    fs::remove_dir_all(source)
                } else {
                    fs::remove_file(source)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Copies a file, or a directory tree, carrying over permissions and mtimes.
    fn copy_path(&self, source: &Path, destination: &Path) -> std::io::Result<()> {
        if !source.is_dir() {
            return self.copy_file(source, destination);
        }

        for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(std::io::Error::other)?;
            let target = destination.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir(&target)?;
            } else {
                self.copy_file(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> std::io::Result<()> {
        fs::copy(source, destination)?;

        let modified = fs::metadata(source)?.modified()?;
        // Read-only copies cannot be opened for writing; the owner may still set times.
        let kept = fs::File::options()
            .write(true)
            .open(destination)
            .or_else(|_| fs::File::open(destination))
            .and_then(|file| file.set_modified(modified));
        if let Err(e) = kept {
            self.output.warning(&format!(
                "Copied {} but could not keep its modification time: {}",
                destination.display(),
                e
            ));
        }
        Ok(())
    }
}

/// Hidden sibling of `destination` used while replacing it.
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.filemapper-{}.tmp", name, std::process::id()))
}

/// True when both paths name the same directory entry.
///
/// Parent directories are canonicalized but the final component is not
/// followed, so a link that points at the source is a different entry.
fn is_same_location(source: &Path, destination: &Path) -> bool {
    fn location(path: &Path) -> Option<PathBuf> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        Some(fs::canonicalize(parent).ok()?.join(path.file_name()?))
    }

    match (location(source), location(destination)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Links `destination` to the canonical absolute path of `source`.
fn link_path(source: &Path, destination: &Path) -> std::io::Result<()> {
    let target = fs::canonicalize(source)?;
    create_symlink(&target, destination)
}

#[cfg(unix)]
fn create_symlink(target: &Path, destination: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, destination)
}

#[cfg(windows)]
fn create_symlink(target: &Path, destination: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, destination)
    } else {
        std::os::windows::fs::symlink_file(target, destination)
    }
}
