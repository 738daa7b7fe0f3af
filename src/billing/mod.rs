//! Billing core: periods, tariff, credit ledger, aggregation and projection.

/// Per-period deltas, costing and open-period extrapolation.
pub mod aggregator;
pub mod engine;
/// Energy and monetary credit carried across periods.
pub mod ledger;
/// Billing periods derived from cut-marker readings.
pub mod period;
pub mod projection;
pub mod summary;
/// Tiered tariff schedule.
pub mod tariff;
