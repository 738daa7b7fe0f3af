//! File output for billing results.

/// CSV export of period results and projection series.
pub mod export;
