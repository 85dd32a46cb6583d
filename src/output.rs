//! Output formatting and styling module.
//!
//! All console output of a run goes through one `OutputFormatter` instance,
//! created at the start of the invocation and handed to every component that
//! reports progress. Nothing here is process-global except the `colored`
//! override toggled by [`OutputFormatter::set_color`].

use crate::report::{EntryStatus, MappingReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for mapping runs
/// - The end-of-run summary table
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    quiet: bool,
}

impl OutputFormatter {
    /// Creates a formatter. In quiet mode only warnings, errors and the
    /// summary are printed.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Enables or disables ANSI colors for the whole process.
    pub fn set_color(enabled: bool) {
        colored::control::set_override(enabled);
    }

    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filemapper::output::OutputFormatter;
    /// OutputFormatter::new(false).success("sub-01.json -> derivatives/smooth/sub-01.json");
    /// ```
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "✓".green(), message);
        }
    }

    /// Prints an error message in red with an X mark.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{}", message.cyan());
        }
    }

    /// Prints a regular message without styling.
    pub fn plain(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    /// Prints a section header.
    pub fn header(&self, header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(&self, message: &str) {
        if !self.quiet {
            println!("{}", format!("[DRY RUN] {}", message).yellow());
        }
    }

    /// Creates a progress bar over `total` mapping entries.
    ///
    /// Returns a hidden bar when `enabled` is false or the formatter is quiet,
    /// so callers can drive it unconditionally.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filemapper::output::OutputFormatter;
    /// let pb = OutputFormatter::new(false).create_progress_bar(100, true);
    /// pb.inc(1);
    /// pb.finish_with_message("done");
    /// ```
    pub fn create_progress_bar(&self, total: u64, enabled: bool) -> ProgressBar {
        if !enabled || self.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints the end-of-run table of outcome counts.
    pub fn summary_table(&self, report: &MappingReport) {
        self.header(if report.dry_run {
            "DRY RUN SUMMARY"
        } else {
            "SUMMARY"
        });

        let rows = [
            (EntryStatus::Succeeded, report.count(EntryStatus::Succeeded)),
            (EntryStatus::Planned, report.count(EntryStatus::Planned)),
            (EntryStatus::Skipped, report.count(EntryStatus::Skipped)),
            (EntryStatus::Failed, report.count(EntryStatus::Failed)),
        ];

        let width = rows
            .iter()
            .map(|(status, _)| status.label().len())
            .max()
            .unwrap_or(0)
            .max(7);

        println!(
            "{:<width$} | {}",
            "Outcome".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (status, count) in rows {
            if count == 0 && status == EntryStatus::Planned && !report.dry_run {
                continue;
            }
            let count_str = count.to_string();
            let count_str = match status {
                EntryStatus::Succeeded | EntryStatus::Planned => count_str.green(),
                EntryStatus::Skipped if count > 0 => count_str.yellow(),
                EntryStatus::Failed if count > 0 => count_str.red(),
                _ => count_str.normal(),
            };
            println!("{:<width$} | {}", status.label(), count_str, width = width);
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} ({} {})",
            "Total".bold(),
            report.records.len().to_string().bold(),
            report.entry_count,
            if report.entry_count == 1 {
                "mapping entry"
            } else {
                "mapping entries"
            },
            width = width
        );
    }
}
