//! Progress reporting.
//!
//! Provides a `Progress` trait and a default implementation using the `tracing` crate.

/// Receives progress notifications during analysis and distribution.
///
/// Calls are synchronous and purely observational: implementations must
/// return promptly and cannot influence control flow.
pub trait Progress {
    /// Reports `message` at `percent` (0..=100) of the current phase.
    fn notify(&self, message: &str, percent: u8);
}

/// Default progress sink that forwards to `tracing` at debug level.
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn notify(&self, message: &str, percent: u8) {
        tracing::debug!(percent, "{}", message);
    }
}

/// No-op progress sink.
pub struct NopProgress;

impl Progress for NopProgress {
    fn notify(&self, _message: &str, _percent: u8) {}
}

/// Percentage of `done` out of `total`, scaled into `span` and offset by `base`.
pub(crate) fn scaled_percent(base: u8, span: u8, done: usize, total: usize) -> u8 {
    let total = total.max(1);
    let p = base as usize + done * span as usize / total;
    p.min(100) as u8
}
