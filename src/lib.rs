//! filemapper - rearrange a dataset with a JSON template
//!
//! This library maps files from a flat source directory into a structured
//! destination tree. A JSON mapping pairs source filename patterns with
//! destination path patterns; `{placeholder}` tokens in both are filled from a
//! `key=value,...` template string. Each destination is realized by copying,
//! moving or symlinking the source, or only previewed in dry-run mode.

pub mod cli;
pub mod config;
pub mod file_action;
pub mod mapper;
pub mod mapping;
pub mod output;
pub mod path_builder;
pub mod report;
pub mod template;

pub use config::{ConfigError, MapperConfig};
pub use file_action::{Action, ActionError, ActionExecutor, ActionOutcome};
pub use mapper::{EntryError, MapOptions, map_entries, process_json_file};
pub use mapping::{MappingEntry, MappingTable};
pub use output::OutputFormatter;
pub use path_builder::{PathBuilder, PathConstructionError};
pub use report::{EntryRecord, EntryStatus, MappingReport};
pub use template::{TemplateBindings, TemplateError, TemplateResolver};

pub use cli::{Cli, RunStatus, run_cli};
