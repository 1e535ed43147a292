//! Progress reporting for a correction run.
//!
//! The pipeline only talks to [`ProgressCallback`]; the binary plugs in an
//! `indicatif` bar and tests use [`NullProgress`].

/// Receives progress updates as records are resolved.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// between the pipeline and the dispatcher.
pub trait ProgressCallback: Send + Sync {
    /// Set the number of records that will be processed.
    fn set_total(&self, total: u64);

    /// Advance by `delta` records.
    fn inc(&self, delta: u64);

    /// Replace the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark the run as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
