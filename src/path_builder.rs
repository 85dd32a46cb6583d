/// Construction of destination paths under the destination root.
///
/// Resolved destination patterns are always relative to the destination root.
/// The builder joins them onto the root and makes sure the parent directory
/// exists, creating intermediate directories as needed.
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Errors that can occur while building a destination path.
#[derive(Debug)]
pub enum PathConstructionError {
    /// The relative pattern is absolute or climbs out of the destination root.
    EscapesRoot { pattern: String },
    /// An existing ancestor of the destination is not a directory.
    NotADirectory { path: PathBuf },
    /// Creating an intermediate directory failed.
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for PathConstructionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EscapesRoot { pattern } => {
                write!(
                    f,
                    "Destination '{}' is not inside the destination root",
                    pattern
                )
            }
            Self::NotADirectory { path } => {
                write!(f, "{} exists and is not a directory", path.display())
            }
            Self::CreateFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for PathConstructionError {}

/// Joins resolved destination patterns onto a destination root.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    root: PathBuf,
    dry_run: bool,
}

impl PathBuilder {
    /// Creates a builder for `root`. With `dry_run` set, no directory is ever created.
    ///
    /// A relative root is made absolute against the current directory, so
    /// every built destination is absolute.
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root, dry_run }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds the destination path for `relative` and ensures its parent exists.
    ///
    /// Calling this repeatedly for paths that share parents is safe. In dry-run
    /// mode the parent is only checked: an existing ancestor that is a regular
    /// file is still reported.
    ///
    /// # Errors
    ///
    /// * `EscapesRoot` if `relative` is absolute or uses `..` to leave the root
    /// * `NotADirectory` if an ancestor exists but is not a directory
    /// * `CreateFailed` if directory creation fails
    pub fn build(&self, relative: &str) -> Result<PathBuf, PathConstructionError> {
        let destination = self.join(relative)?;

        if let Some(parent) = destination.parent() {
            if self.dry_run {
                Self::check_ancestors(parent)?;
            } else {
                Self::ensure_dir(parent)?;
            }
        }

        Ok(destination)
    }

    /// Joins `relative` onto the root without touching the filesystem.
    pub fn join(&self, relative: &str) -> Result<PathBuf, PathConstructionError> {
        if !stays_inside(relative) {
            return Err(PathConstructionError::EscapesRoot {
                pattern: relative.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn ensure_dir(dir: &Path) -> Result<(), PathConstructionError> {
        if dir.is_dir() {
            return Ok(());
        }
        Self::check_ancestors(dir)?;

        fs::create_dir_all(dir).map_err(|e| PathConstructionError::CreateFailed {
            path: dir.to_path_buf(),
            source: e,
        })
    }

    /// Fails if the nearest existing ancestor of `dir` is not a directory.
    fn check_ancestors(dir: &Path) -> Result<(), PathConstructionError> {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            if let Ok(metadata) = fs::metadata(ancestor) {
                if metadata.is_dir() {
                    return Ok(());
                }
                return Err(PathConstructionError::NotADirectory {
                    path: ancestor.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

/// Returns true if `relative` names something strictly below the directory
/// it is joined onto.
///
/// Absolute paths, drive prefixes, a `..` that climbs above the start, and
/// paths that reduce to the start itself (`""`, `.`, `a/..`) are rejected.
pub fn stays_inside(relative: &str) -> bool {
    let mut depth: usize = 0;
    for component in Path::new(relative).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return false,
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
        }
    }
    depth > 0
}
