//! Placeholder substitution for mapping patterns.
//!
//! Patterns such as `derivatives/{pipeline}/{subject}_T1w.json` are resolved
//! against a set of bindings parsed from a `key=value,key=value` string.
//!
//! ```
//! use filemapper::template::{TemplateBindings, TemplateResolver};
//!
//! let bindings: TemplateBindings = "subject=sub-01,pipeline=smooth".parse().unwrap();
//! let resolver = TemplateResolver::new(bindings);
//! assert_eq!(
//!     resolver.resolve("derivatives/{pipeline}/{subject}.json").unwrap(),
//!     "derivatives/smooth/sub-01.json"
//! );
//! ```

use crate::config::ConfigError;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("Invalid placeholder regex"));

/// Errors raised while substituting placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// One or more placeholders in the pattern have no binding.
    UnresolvedPlaceholder {
        /// The pattern being resolved.
        pattern: String,
        /// Every unbound placeholder name, in order of first appearance.
        names: Vec<String>,
    },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedPlaceholder { pattern, names } => {
                let names: Vec<String> = names.iter().map(|n| format!("{{{}}}", n)).collect();
                write!(
                    f,
                    "Unresolved placeholder(s) {} in pattern '{}'",
                    names.join(", "),
                    pattern
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Placeholder name to substitution value, built once from the CLI template string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateBindings {
    values: BTreeMap<String, String>,
}

impl TemplateBindings {
    /// Parses a comma separated `key=value` list.
    ///
    /// Values may themselves contain `=`; only the first one splits. Empty
    /// segments are ignored, so `""` and `"a=1,"` are both accepted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTemplate` for a segment without `=`, an
    /// empty or malformed key, or a key that appears twice.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let mut values = BTreeMap::new();

        for segment in template.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ConfigError::InvalidTemplate(format!("'{}' is not a key=value pair", segment))
            })?;
            let key = key.trim();

            if key.is_empty() {
                return Err(ConfigError::InvalidTemplate(format!(
                    "'{}' has an empty key",
                    segment
                )));
            }
            if key.contains(['{', '}']) || key.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidTemplate(format!(
                    "'{}' is not a valid placeholder name",
                    key
                )));
            }
            if values
                .insert(key.to_string(), value.trim().to_string())
                .is_some()
            {
                return Err(ConfigError::InvalidTemplate(format!(
                    "key '{}' is bound more than once",
                    key
                )));
            }
        }

        Ok(Self { values })
    }

    /// Returns the value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for TemplateBindings {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Substitutes `{name}` placeholders using a fixed set of bindings.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    bindings: TemplateBindings,
}

impl TemplateResolver {
    pub fn new(bindings: TemplateBindings) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &TemplateBindings {
        &self.bindings
    }

    /// Resolves every placeholder in `pattern`.
    ///
    /// Literal text, including braces that do not form a placeholder such as
    /// `{}`, is copied verbatim. Bindings not referenced by the pattern are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Fails with `TemplateError::UnresolvedPlaceholder` naming every
    /// placeholder that has no binding. Nothing is partially substituted.
    pub fn resolve(&self, pattern: &str) -> Result<String, TemplateError> {
        let mut missing: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(pattern) {
            let name = &caps[1];
            if self.bindings.get(name).is_none() && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }

        if !missing.is_empty() {
            return Err(TemplateError::UnresolvedPlaceholder {
                pattern: pattern.to_string(),
                names: missing,
            });
        }

        let resolved = PLACEHOLDER.replace_all(pattern, |caps: &Captures| {
            self.bindings.get(&caps[1]).unwrap_or_default().to_string()
        });
        Ok(resolved.into_owned())
    }

    /// Lists the placeholder names referenced by `pattern`, in order.
    pub fn placeholders(pattern: &str) -> Vec<String> {
        PLACEHOLDER
            .captures_iter(pattern)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(template: &str) -> TemplateResolver {
        TemplateResolver::new(template.parse().expect("Failed to parse template"))
    }

    #[test]
    fn test_parse_bindings() {
        let bindings =
            TemplateBindings::parse("subject=sub-01,pipeline=smooth,session=baseline").unwrap();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.get("subject"), Some("sub-01"));
        assert_eq!(bindings.get("pipeline"), Some("smooth"));
        assert_eq!(bindings.get("session"), Some("baseline"));
        assert_eq!(bindings.get("run"), None);
    }

    #[test]
    fn test_parse_trims_and_skips_empty_segments() {
        let bindings = TemplateBindings::parse(" subject = sub-01 , ,run=2,").unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.get("subject"), Some("sub-01"));
        assert_eq!(bindings.get("run"), Some("2"));
    }

    #[test]
    fn test_parse_empty_string_yields_no_bindings() {
        let bindings = TemplateBindings::parse("").unwrap();
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_parse_value_may_contain_equals() {
        let bindings = TemplateBindings::parse("filter=a=b").unwrap();
        assert_eq!(bindings.get("filter"), Some("a=b"));
    }

    #[test]
    fn test_parse_rejects_malformed_segments() {
        assert!(matches!(
            TemplateBindings::parse("subject"),
            Err(ConfigError::InvalidTemplate(_))
        ));
        assert!(matches!(
            TemplateBindings::parse("=sub-01"),
            Err(ConfigError::InvalidTemplate(_))
        ));
        assert!(matches!(
            TemplateBindings::parse("{subject}=sub-01"),
            Err(ConfigError::InvalidTemplate(_))
        ));
        assert!(matches!(
            TemplateBindings::parse("my key=1"),
            Err(ConfigError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_keys() {
        let result = TemplateBindings::parse("subject=sub-01,subject=sub-02");
        assert!(matches!(result, Err(ConfigError::InvalidTemplate(_))));
    }

    #[test]
    fn test_resolve_full_substitution() {
        let resolver = resolver("subject=sub-01,pipeline=smooth,session=baseline");
        let resolved = resolver
            .resolve("derivatives/{pipeline}/{subject}-{session}_T1w.json")
            .unwrap();

        assert_eq!(resolved, "derivatives/smooth/sub-01-baseline_T1w.json");
        assert!(!resolved.contains('{') && !resolved.contains('}'));
    }

    #[test]
    fn test_resolve_repeated_placeholder() {
        let resolver = resolver("subject=sub-01");
        assert_eq!(
            resolver.resolve("{subject}/{subject}.json").unwrap(),
            "sub-01/sub-01.json"
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = resolver("subject=sub-01,session=baseline");
        let first = resolver.resolve("{subject}_{session}.nii.gz").unwrap();
        let second = resolver.resolve("{subject}_{session}.nii.gz").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_ignores_unused_bindings() {
        let resolver = resolver("subject=sub-01,unused=whatever");
        assert_eq!(resolver.resolve("{subject}.json").unwrap(), "sub-01.json");
    }

    #[test]
    fn test_resolve_without_placeholders_is_verbatim() {
        let resolver = resolver("subject=sub-01");
        assert_eq!(
            resolver.resolve("participants.tsv").unwrap(),
            "participants.tsv"
        );
    }

    #[test]
    fn test_resolve_keeps_non_placeholder_braces() {
        let resolver = resolver("subject=sub-01");
        assert_eq!(
            resolver.resolve("{}/{subject}/a{b").unwrap(),
            "{}/sub-01/a{b"
        );
    }

    #[test]
    fn test_resolve_reports_all_missing_placeholders() {
        let resolver = resolver("subject=sub-01");
        let err = resolver
            .resolve("{pipeline}/{subject}-{session}-{pipeline}.json")
            .unwrap_err();

        let TemplateError::UnresolvedPlaceholder { pattern, names } = err;
        assert_eq!(pattern, "{pipeline}/{subject}-{session}-{pipeline}.json");
        assert_eq!(names, vec!["pipeline".to_string(), "session".to_string()]);
    }

    #[test]
    fn test_unresolved_placeholder_display() {
        let err = TemplateError::UnresolvedPlaceholder {
            pattern: "{a}/{b}".to_string(),
            names: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unresolved placeholder(s) {a}, {b} in pattern '{a}/{b}'"
        );
    }

    #[test]
    fn test_placeholders_lists_names() {
        assert_eq!(
            TemplateResolver::placeholders("{pipeline}/{subject}.json"),
            vec!["pipeline".to_string(), "subject".to_string()]
        );
        assert!(TemplateResolver::placeholders("plain.txt").is_empty());
    }
}
