//! The correction run.
//!
//! Load, back up, filter, then walk the eligible records in batches. Each
//! batch first tries to read a coordinate straight out of the record name,
//! dispatches the rest to the resolver, and applies the verdicts in
//! collection order before pacing on to the next batch. The collection is
//! written back only when at least one record changed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use spot_coords_geocoder::distance::{distance_km, should_correct};
use spot_coords_geocoder::{BoundingWindow, CoordinatePair, LocationResolver, dms};
use spot_coords_models::progress::ProgressCallback;
use spot_coords_models::{CorrectionRecord, LocationRecord, RunSummary};

use crate::config::{ConfigError, CorrectionConfig};
use crate::dispatcher::{self, ResolveTask};
use crate::store::{self, BackupError, LoadError, LoadedCollection, PersistError, PersistOutcome};

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Spots collection to correct in place.
    pub input_path: PathBuf,
    /// Thresholds, pacing and window.
    pub config: CorrectionConfig,
    /// Resolve and report, but write nothing (not even the backup).
    pub dry_run: bool,
}

/// A record whose lookup produced no usable coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    /// Record position in the collection.
    pub index: usize,
    /// Display name.
    pub name: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Outcome counts.
    pub summary: RunSummary,
    /// Applied changes, in collection order.
    pub corrections: Vec<CorrectionRecord>,
    /// Records left untouched because resolution failed.
    pub failures: Vec<FailedRecord>,
    /// Where the input was copied before the run, unless dry-running.
    pub backup_path: Option<PathBuf>,
    /// Where results were written, if anything was.
    pub persisted: Option<PersistOutcome>,
}

/// A fatal run error.
#[derive(Debug, thiserror::Error)]
pub enum CorrectionError {
    /// Configuration was rejected before anything was read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The safety copy could not be written.
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// Results were computed but could not be written.
    #[error("{source}")]
    Persist {
        /// The completed report, so counts and corrections are not lost.
        report: Box<RunReport>,
        /// Underlying error.
        source: PersistError,
    },
}

/// What to do with one resolved record.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verdict {
    Correct { to: CoordinatePair, distance_km: f64 },
    Keep { distance_km: f64 },
    Failed,
}

/// Results that are not valid WGS84 or fall outside `window` count as
/// failed lookups, whatever the resolver claims.
fn evaluate(
    current: CoordinatePair,
    found: Option<CoordinatePair>,
    window: &BoundingWindow,
    threshold_km: f64,
) -> Verdict {
    let Some(to) = found else {
        return Verdict::Failed;
    };
    if !to.is_valid() || !window.contains(to) {
        log::warn!("Rejecting lookup result {to} outside the accepted window");
        return Verdict::Failed;
    }
    let distance = distance_km(current, to);
    if should_correct(current, to, threshold_km) {
        Verdict::Correct {
            to,
            distance_km: distance,
        }
    } else {
        Verdict::Keep {
            distance_km: distance,
        }
    }
}

/// Records with a display name to look up and coordinates that were set
/// at some point. Returns `(index, query)` pairs in collection order.
fn eligible(records: &[LocationRecord]) -> Vec<(usize, String)> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.coordinates.is_unset())
        .filter_map(|(i, r)| r.query().map(|q| (i, q.to_string())))
        .collect()
}

fn apply(record: &mut LocationRecord, index: usize, verdict: Verdict, report: &mut RunReport) {
    let label = record.query().unwrap_or_default().to_string();

    match verdict {
        Verdict::Correct { to, distance_km } => {
            let from = record.coordinates;
            log::info!("Corrected '{label}': {from} -> {to} ({distance_km:.2} km)");
            record.set_coordinates(to);
            report.summary.corrected += 1;
            report.corrections.push(CorrectionRecord {
                index,
                name: label,
                old_coords: from,
                new_coords: to,
                distance_km,
            });
        }
        Verdict::Keep { distance_km } => {
            log::debug!("'{label}' is {distance_km:.3} km from lookup, keeping");
            report.summary.unchanged += 1;
        }
        Verdict::Failed => {
            log::error!("Failed to resolve coordinates for '{label}'");
            report.summary.failed += 1;
            report.failures.push(FailedRecord { index, name: label });
        }
    }
}

/// Runs a full correction pass over `options.input_path`.
///
/// # Errors
///
/// * [`CorrectionError::Config`] if the configuration is invalid.
/// * [`CorrectionError::Load`] if the input cannot be read.
/// * [`CorrectionError::Backup`] if the backup cannot be written.
/// * [`CorrectionError::Persist`] if corrections were found but could not
///   be saved. The error carries the full report.
pub async fn run(
    resolver: &dyn LocationResolver,
    options: &PipelineOptions,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<RunReport, CorrectionError> {
    let config = &options.config;
    config.validate()?;

    let input = options.input_path.as_path();
    let LoadedCollection { raw, mut records } = store::load(input)?;
    log::info!("Loaded {} spots from {}", records.len(), input.display());

    let mut report = RunReport {
        summary: RunSummary {
            total: records.len(),
            ..RunSummary::default()
        },
        ..RunReport::default()
    };

    if options.dry_run {
        log::info!("Dry run: skipping backup and output");
    } else {
        let backup = store::write_backup(input, &raw)?;
        log::info!("Backup created: {}", backup.display());
        report.backup_path = Some(backup);
    }

    let eligible = eligible(&records);
    report.summary.skipped = records.len() - eligible.len();
    if report.summary.skipped > 0 {
        log::info!(
            "Skipping {} spots with no name or unset coordinates",
            report.summary.skipped
        );
    }

    if let Some(p) = &progress {
        p.set_total(eligible.len() as u64);
    }

    let batch_size = config.concurrency;
    let batch_count = eligible.len().div_ceil(batch_size);
    let dispatch_options = config.dispatch_options();

    for (n, batch) in eligible.chunks(batch_size).enumerate() {
        log::info!("Processing batch {}/{batch_count}", n + 1);
        if let Some(p) = &progress {
            p.set_message(format!("batch {}/{batch_count}", n + 1));
        }

        let mut outcomes = BTreeMap::new();
        let mut tasks = Vec::new();
        for (index, query) in batch {
            if let Some(pair) = dms::parse(&records[*index].name, &config.window) {
                log::info!("'{query}': read {pair} from the name itself");
                outcomes.insert(*index, Some(pair));
                if let Some(p) = &progress {
                    p.inc(1);
                }
            } else {
                tasks.push(ResolveTask {
                    id: *index,
                    query: query.clone(),
                    address: records[*index].address.clone(),
                });
            }
        }

        if !tasks.is_empty() {
            outcomes.extend(
                dispatcher::dispatch(resolver, tasks, &dispatch_options, progress.as_ref()).await,
            );
        }

        for (index, found) in outcomes {
            let record = &mut records[index];
            let verdict = evaluate(
                record.coordinates,
                found,
                &config.window,
                config.threshold_km,
            );
            apply(record, index, verdict, &mut report);
        }

        if n + 1 < batch_count && !config.batch_delay().is_zero() {
            tokio::time::sleep(config.batch_delay()).await;
        }
    }

    if report.corrections.is_empty() {
        log::info!("No spots needed correction; nothing written");
    } else if options.dry_run {
        log::info!(
            "Dry run: {} corrections computed but not written",
            report.corrections.len()
        );
    } else {
        match store::persist(&records, input) {
            Ok(outcome) => report.persisted = Some(outcome),
            Err(source) => {
                return Err(CorrectionError::Persist {
                    report: Box::new(report),
                    source,
                });
            }
        }
    }

    if let Some(p) = &progress {
        p.finish(format!(
            "{} corrected, {} unchanged, {} failed",
            report.summary.corrected, report.summary.unchanged, report.summary.failed
        ));
    }

    Ok(report)
}
