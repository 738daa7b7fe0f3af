//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::billing::aggregator::PeriodResult;
use crate::billing::ledger::CreditBalance;
use crate::billing::period::Period;
use crate::billing::summary::BillingSummary;

/// Derived periods and the index selected for display.
#[derive(Debug, Serialize)]
pub struct PeriodsResponse {
    pub periods: Vec<Period>,
    pub active: Option<usize>,
}

/// Selected period with its result, carried credit and historical summary.
///
/// `active_result` is `null` when the selected period lacks data.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub today: String,
    pub active_period: Option<Period>,
    pub active_result: Option<PeriodResult>,
    pub carried: CreditBalance,
    pub summary: BillingSummary,
}

/// Optional period selection for `/projection`.
#[derive(Debug, Deserialize)]
pub struct ProjectionQuery {
    /// Zero-based period index; defaults to the active period.
    pub period: Option<usize>,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
