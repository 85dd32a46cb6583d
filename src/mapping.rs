/// Loading of the JSON mapping table.
///
/// A mapping file is a single JSON object whose keys are source filename
/// patterns and whose values are destination path patterns:
///
/// ```json
/// {
///     "{subject}.json": "derivatives/{pipeline}/{subject}-{session}_T1w.json",
///     "{subject}.nii.gz": "derivatives/{pipeline}/{subject}-{session}_T1w.nii.gz"
/// }
/// ```
///
/// Entries keep the order they have in the file.
use crate::config::ConfigError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One source pattern and the destination pattern it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub source_pattern: String,
    pub dest_pattern: String,
}

/// Ordered, immutable list of mapping entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    /// Reads and parses a mapping file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MappingNotFound` if the file does not exist,
    /// `ConfigError::IoError` if it cannot be read and
    /// `ConfigError::MappingInvalid` if it is not a JSON object of strings.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MappingNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_json_str(&content).map_err(|reason| ConfigError::MappingInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parses a mapping table from JSON text.
    ///
    /// Returns a human-readable reason on failure.
    pub fn from_json_str(content: &str) -> Result<Self, String> {
        let json: Value =
            serde_json::from_str(content).map_err(|e| format!("JSON parse error: {}", e))?;

        let object = json
            .as_object()
            .ok_or_else(|| "top-level value must be a JSON object".to_string())?;

        let entries = object
            .iter()
            .map(|(source, dest)| {
                let dest = dest.as_str().ok_or_else(|| {
                    format!("destination for '{}' must be a string, found {}", source, dest)
                })?;
                Ok(MappingEntry {
                    source_pattern: source.clone(),
                    dest_pattern: dest.to_string(),
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for MappingTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(source_pattern, dest_pattern)| MappingEntry {
                    source_pattern,
                    dest_pattern,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_preserves_file_order() {
        let table = MappingTable::from_json_str(
            r#"{
                "z.json": "last/z.json",
                "{subject}.json": "derivatives/{subject}.json",
                "a.json": "first/a.json"
            }"#,
        )
        .unwrap();

        let sources: Vec<&str> = table
            .entries()
            .iter()
            .map(|e| e.source_pattern.as_str())
            .collect();
        assert_eq!(sources, vec!["z.json", "{subject}.json", "a.json"]);
        assert_eq!(table.entries()[1].dest_pattern, "derivatives/{subject}.json");
    }

    #[test]
    fn test_parse_empty_object() {
        let table = MappingTable::from_json_str("{}").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(MappingTable::from_json_str(r#"["a", "b"]"#).is_err());
        assert!(MappingTable::from_json_str(r#""a""#).is_err());
    }

    #[test]
    fn test_parse_rejects_non_string_destination() {
        let err = MappingTable::from_json_str(r#"{"a.json": 3}"#).unwrap_err();
        assert!(err.contains("a.json"));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = MappingTable::from_json_str(r#"{"a.json": "b.json""#).unwrap_err();
        assert!(err.starts_with("JSON parse error"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = MappingTable::load(Path::new("/non/existent/mapping.json"));
        assert!(matches!(result, Err(ConfigError::MappingNotFound(_))));
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("mapping.json");
        fs::write(&path, "not json").expect("Failed to write mapping");

        let result = MappingTable::load(&path);
        assert!(matches!(result, Err(ConfigError::MappingInvalid { .. })));
    }

    #[test]
    fn test_load_valid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("mapping.json");
        fs::write(&path, r#"{"{subject}.json": "out/{subject}.json"}"#)
            .expect("Failed to write mapping");

        let table = MappingTable::load(&path).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_collect_from_pairs() {
        let table: MappingTable = vec![("a".to_string(), "b".to_string())]
            .into_iter()
            .collect();
        assert_eq!(
            table.entries(),
            &[MappingEntry {
                source_pattern: "a".to_string(),
                dest_pattern: "b".to_string(),
            }]
        );
    }
}
