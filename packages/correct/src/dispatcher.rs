//! Bounded-concurrency lookup dispatch.
//!
//! Tasks are admitted in groups of at most `concurrency`. Every lookup in a
//! group runs under its own timeout; the group is joined, its outcomes are
//! read, and the dispatcher sleeps for the pacing interval before admitting
//! the next group. A failing, panicking, or slow lookup only ever costs its
//! own record.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt as _;
use spot_coords_geocoder::{CoordinatePair, LocationResolver, LookupError};
use spot_coords_models::progress::ProgressCallback;

/// One record to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTask {
    /// Record position in the collection.
    pub id: usize,
    /// Text handed to the resolver.
    pub query: String,
    /// The record's free-text address, passed along as context.
    pub address: String,
}

/// How lookups are admitted and bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Maximum lookups in flight.
    pub concurrency: usize,
    /// Sleep after each group settles.
    pub pacing: Duration,
    /// Hard limit for a single lookup.
    pub task_timeout: Duration,
}

/// Why a single lookup produced no coordinate.
enum TaskFailure {
    Lookup(LookupError),
    Panicked,
}

/// Resolves every task, returning exactly one entry per task id.
///
/// `None` means the lookup found nothing, failed, timed out, or panicked.
/// Those cases are logged here; callers only need the map.
pub async fn dispatch(
    resolver: &dyn LocationResolver,
    tasks: Vec<ResolveTask>,
    options: &DispatchOptions,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> BTreeMap<usize, Option<CoordinatePair>> {
    let group_size = options.concurrency.max(1);
    let mut outcomes = BTreeMap::new();

    for group in tasks.chunks(group_size) {
        let settled = futures::future::join_all(
            group
                .iter()
                .map(|task| resolve_one(resolver, task, options.task_timeout)),
        )
        .await;

        for (task, result) in group.iter().zip(settled) {
            let outcome = match result {
                Ok(Some(pair)) => {
                    log::debug!("'{}': resolved to {pair}", task.query);
                    Some(pair)
                }
                Ok(None) => {
                    log::warn!("'{}': no coordinates found", task.query);
                    None
                }
                Err(TaskFailure::Lookup(LookupError::RateLimited)) => {
                    log::warn!("'{}': rate limited by map service", task.query);
                    None
                }
                Err(TaskFailure::Lookup(e)) => {
                    log::warn!("'{}': lookup failed: {e}", task.query);
                    None
                }
                Err(TaskFailure::Panicked) => {
                    log::error!("'{}': lookup panicked", task.query);
                    None
                }
            };
            outcomes.insert(task.id, outcome);

            if let Some(p) = progress {
                p.inc(1);
            }
        }

        if !options.pacing.is_zero() {
            tokio::time::sleep(options.pacing).await;
        }
    }

    outcomes
}

async fn resolve_one(
    resolver: &dyn LocationResolver,
    task: &ResolveTask,
    limit: Duration,
) -> Result<Option<CoordinatePair>, TaskFailure> {
    let lookup = AssertUnwindSafe(resolver.resolve_with_address(&task.query, &task.address))
        .catch_unwind();

    match tokio::time::timeout(limit, lookup).await {
        Ok(Ok(result)) => result.map_err(TaskFailure::Lookup),
        Ok(Err(_)) => Err(TaskFailure::Panicked),
        Err(_) => Err(TaskFailure::Lookup(LookupError::Timeout(limit))),
    }
}
