//! Progress reporting hooks shared by the batch pipelines.

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a unit of work (one export item, one media record, one file).
    fn item(&self, label: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn finish(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
    fn finish(&self) {}
}
