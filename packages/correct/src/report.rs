//! Run summaries for the operator.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use spot_coords_models::{CorrectionRecord, RunSummary};

use crate::pipeline::{FailedRecord, RunReport};

/// Logs the outcome counts, the first `show` corrections and the names of
/// every record that could not be resolved.
pub fn log_report(report: &RunReport, show: usize) {
    let s = &report.summary;
    log::info!(
        "Done: {} spots, {} corrected, {} unchanged, {} failed, {} skipped",
        s.total,
        s.corrected,
        s.unchanged,
        s.failed,
        s.skipped
    );

    for line in correction_lines(&report.corrections, show) {
        log::info!("{line}");
    }

    if !report.failures.is_empty() {
        let names: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
        log::error!(
            "Could not resolve {} spots: {}",
            names.len(),
            names.join(", ")
        );
    }
}

fn correction_lines(corrections: &[CorrectionRecord], show: usize) -> Vec<String> {
    let mut lines: Vec<String> = corrections
        .iter()
        .take(show)
        .map(|c| {
            format!(
                "  {}: {} -> {} ({:.2} km)",
                c.name, c.old_coords, c.new_coords, c.distance_km
            )
        })
        .collect();

    let hidden = corrections.len().saturating_sub(show);
    if hidden > 0 {
        lines.push(format!("  ... and {hidden} more"));
    }
    lines
}

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    generated_at: DateTime<Utc>,
    input: &'a Path,
    summary: RunSummary,
    corrections: &'a [CorrectionRecord],
    failures: &'a [FailedRecord],
    backup_path: Option<&'a Path>,
    corrected_path: Option<&'a Path>,
}

/// Writes the full report as pretty JSON to `path`.
///
/// # Errors
///
/// Returns an error if the report cannot be serialized or written.
pub fn write_json(
    path: &Path,
    input: &Path,
    report: &RunReport,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let file = ReportFile {
        generated_at: Utc::now(),
        input,
        summary: report.summary,
        corrections: &report.corrections,
        failures: &report.failures,
        backup_path: report.backup_path.as_deref(),
        corrected_path: report
            .persisted
            .as_ref()
            .map(|p| p.corrected_path.as_path()),
    };

    let json = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, json)?;
    log::info!("Report written to {}", path.display());

    Ok(path.to_path_buf())
}
