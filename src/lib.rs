//! Net-metering bimestre billing: periods, tiered tariff, carried credit
//! and open-period projection from bidirectional meter readings.

#[cfg(feature = "api")]
pub mod api;
/// Billing engine and its components.
pub mod billing;
pub mod config;
pub mod io;
pub mod reading;
/// Reading storage boundary.
pub mod store;
