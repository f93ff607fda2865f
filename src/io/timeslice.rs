// src/io/timeslice.rs

//! Scheduler-budget accounting.
//!
//! Callers embedded in a cooperative scheduler may want to charge the cost
//! of each syscall against their own scheduling budget. Every launch, read,
//! and write reports its elapsed wall time here as a percentage of a 1 ms
//! timeslice. This is an accounting hook, not a correctness requirement;
//! the default meter discards the reports.

use std::time::Duration;

/// Sink for per-operation cost reports.
pub trait TimesliceMeter: Send + Sync {
    /// `percent` is in `1..=100`, the share of a 1 ms timeslice the
    /// operation consumed (clamped).
    fn consumed(&self, percent: u8);
}

/// Discards all reports.
pub struct NoopMeter;

impl TimesliceMeter for NoopMeter {
    fn consumed(&self, _percent: u8) {}
}

/// Convert elapsed wall time to a timeslice percentage: elapsed µs / 10,
/// clamped to `1..=100`. Even an instant operation accounts for 1%.
pub fn timeslice_percent(elapsed: Duration) -> u8 {
    let pct = elapsed.as_micros() / 10;
    pct.clamp(1, 100) as u8
}
