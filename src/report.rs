/// Per-run collection of entry outcomes.
///
/// Every source/destination pair the driver visits produces one
/// `EntryRecord`. The report is created at the start of a run, filled in as
/// entries are processed and optionally written to disk as JSON afterwards.
use crate::file_action::Action;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// The action was performed.
    Succeeded,
    /// Dry run: the action would have been performed.
    Planned,
    /// The entry could not be resolved or its source was missing.
    Skipped,
    /// Building the destination or running the action failed.
    Failed,
}

impl EntryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            EntryStatus::Succeeded => "Succeeded",
            EntryStatus::Planned => "Planned",
            EntryStatus::Skipped => "Skipped",
            EntryStatus::Failed => "Failed",
        }
    }
}

/// What happened to one source/destination pair.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    /// Source pattern as written in the mapping file.
    pub source_pattern: String,
    /// Destination pattern as written in the mapping file.
    pub dest_pattern: String,
    /// Resolved source path, when resolution got that far.
    pub source: Option<PathBuf>,
    /// Resolved destination path, when resolution got that far.
    pub destination: Option<PathBuf>,
    pub status: EntryStatus,
    /// Error or warning text for this entry.
    pub message: Option<String>,
}

/// Summary of a complete mapping run.
#[derive(Debug, Clone, Serialize)]
pub struct MappingReport {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub dry_run: bool,
    /// Number of entries in the mapping table.
    pub entry_count: usize,
    pub records: Vec<EntryRecord>,
}

impl MappingReport {
    pub fn new(action: Action, dry_run: bool, entry_count: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            dry_run,
            entry_count,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: EntryRecord) {
        self.records.push(record);
    }

    /// Number of records with the given status.
    pub fn count(&self, status: EntryStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Records that were skipped or failed.
    pub fn problems(&self) -> impl Iterator<Item = &EntryRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.status, EntryStatus::Skipped | EntryStatus::Failed))
    }

    /// Returns true if no entry was skipped or failed.
    pub fn is_complete_success(&self) -> bool {
        self.problems().next().is_none()
    }

    /// Writes the report to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    fn record(status: EntryStatus) -> EntryRecord {
        EntryRecord {
            source_pattern: "{subject}.json".to_string(),
            dest_pattern: "out/{subject}.json".to_string(),
            source: Some(PathBuf::from("/src/sub-01.json")),
            destination: Some(PathBuf::from("/dst/out/sub-01.json")),
            status,
            message: None,
        }
    }

    #[test]
    fn test_counts_by_status() {
        let mut report = MappingReport::new(Action::Copy, false, 3);
        report.push(record(EntryStatus::Succeeded));
        report.push(record(EntryStatus::Succeeded));
        report.push(record(EntryStatus::Skipped));

        assert_eq!(report.count(EntryStatus::Succeeded), 2);
        assert_eq!(report.count(EntryStatus::Skipped), 1);
        assert_eq!(report.count(EntryStatus::Failed), 0);
        assert!(!report.is_complete_success());
        assert_eq!(report.problems().count(), 1);
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = MappingReport::new(Action::Symlink, true, 0);
        assert!(report.is_complete_success());
    }

    #[test]
    fn test_save_writes_json() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("reports/run.json");

        let mut report = MappingReport::new(Action::Move, true, 1);
        report.push(record(EntryStatus::Planned));
        report.save(&path).expect("Failed to save report");

        let json: Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).expect("Invalid JSON");
        assert_eq!(json["action"], "move");
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["entry_count"], 1);
        assert_eq!(json["records"][0]["status"], "planned");
        assert_eq!(json["records"][0]["source"], "/src/sub-01.json");
        assert!(json["timestamp"].is_string());
    }
}
