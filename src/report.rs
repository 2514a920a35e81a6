//! Output formatting for experiment results.
//!
//! Provides two formats: a human-readable text summary and JSON.

use std::fmt::Write;
use std::time::Duration;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::compare::{ColumnDifference, QueryComparison, ResultSetComparisonSummary, COMPARATOR_VERSION};
use crate::experiment::{ExperimentResult, ItemOutcome};

/// Default cap on row differences listed per result set.
pub const DEFAULT_MAX_DIFFERENCES: usize = 10;

/// JSON output structure.
#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    comparator_version: u32,
    all_identical: bool,
    duration_ms: u64,
    #[serde(flatten)]
    result: &'a ExperimentResult,
}

/// Formats experiment results.
pub struct ReportRenderer {
    format: OutputFormat,
    max_differences: usize,
}

impl ReportRenderer {
    /// Creates a new renderer.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            max_differences: DEFAULT_MAX_DIFFERENCES,
        }
    }

    /// Limits how many row differences are listed per result set in text output.
    pub fn with_max_differences(mut self, max_differences: usize) -> Self {
        self.max_differences = max_differences;
        self
    }

    /// Formats the result according to the configured format.
    pub fn render(&self, result: &ExperimentResult, duration: Duration) -> String {
        match self.format {
            OutputFormat::Text => self.format_text(result, duration),
            OutputFormat::Json => format_json(result, duration),
        }
    }

    fn format_text(&self, result: &ExperimentResult, duration: Duration) -> String {
        let mut out = String::new();
        let single = result.len() == 1 && !result.stopped_early;

        for item in &result.items {
            let label = if single {
                "Result".to_string()
            } else {
                format!("Collection {}", item.collection_index)
            };
            match &item.outcome {
                ItemOutcome::Compared(comparison) if comparison.results_are_identical => {
                    let _ = writeln!(out, "{label}: identical");
                }
                ItemOutcome::Compared(comparison) => {
                    let _ = writeln!(out, "{label}: DIFFERENT");
                    self.write_comparison(&mut out, comparison);
                }
                ItemOutcome::Failed(error) => {
                    let _ = writeln!(out, "{label}: FAILED");
                    let _ = writeln!(out, "  {error}");
                }
            }
        }

        if result.stopped_early {
            out.push_str("Stopped at first mismatch; remaining collections were not compared.\n");
        }

        let identical = result.items.iter().filter(|i| i.is_identical()).count();
        let failed = result.failures().count();
        let different = result.len() - identical - failed;
        let _ = writeln!(
            out,
            "\n{} compared in {}ms: {} identical, {} different, {} failed",
            plural(result.len(), "collection"),
            duration.as_millis(),
            identical,
            different,
            failed
        );
        out
    }

    fn write_comparison(&self, out: &mut String, comparison: &QueryComparison) {
        if comparison.result_set_counts_are_not_same {
            let (first, second) = comparison.result_set_counts;
            let _ = writeln!(
                out,
                "  Result set count differs: {first} vs {second} (compared first {})",
                first.min(second)
            );
        }

        for (index, summary) in comparison.result_set_comparisons.iter().enumerate() {
            if summary.results_are_identical {
                continue;
            }
            let _ = writeln!(out, "  Result set {index}:");
            self.write_summary(out, summary);
        }
    }

    fn write_summary(&self, out: &mut String, summary: &ResultSetComparisonSummary) {
        if summary.column_count_mismatch {
            out.push_str("    Column count differs\n");
        }
        for diff in &summary.column_differences {
            let _ = writeln!(
                out,
                "    Column {}: {} differ",
                diff.index,
                column_flags(diff).join(", ")
            );
        }
        if summary.row_count_mismatch {
            out.push_str("    Row count differs\n");
        }

        for row in summary.data_differences.iter().take(self.max_differences) {
            let columns: Vec<String> = row
                .cells
                .iter()
                .map(|c| c.column_index.to_string())
                .collect();
            let _ = writeln!(
                out,
                "    Row {}: column(s) {} differ",
                row.row_index,
                columns.join(", ")
            );
        }
        let hidden = summary.data_differences.len().saturating_sub(self.max_differences);
        if hidden > 0 {
            let _ = writeln!(out, "    ... {} more", plural(hidden, "row difference"));
        }
    }
}

fn column_flags(diff: &ColumnDifference) -> Vec<&'static str> {
    [
        (diff.name_is_different, "name"),
        (diff.type_is_different, "type"),
        (diff.nullability_is_different, "nullability"),
        (diff.size_is_different, "size"),
    ]
    .into_iter()
    .filter_map(|(different, label)| different.then_some(label))
    .collect()
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Formats as JSON.
fn format_json(result: &ExperimentResult, duration: Duration) -> String {
    let json_output = JsonOutput {
        comparator_version: COMPARATOR_VERSION,
        all_identical: result.all_identical(),
        duration_ms: duration.as_millis() as u64,
        result,
    };

    serde_json::to_string_pretty(&json_output)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e))
}
