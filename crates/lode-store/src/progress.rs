/// Receives progress from long-running scans.
///
/// `total` is called once before the scan starts, `increment` once per item
/// processed.
pub trait ProgressSink {
    /// Announce the number of items the scan will process.
    fn total(&mut self, total: u64);

    /// One more item was processed.
    fn increment(&mut self);
}
