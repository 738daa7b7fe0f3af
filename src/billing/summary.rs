//! Historical totals computed post-hoc from period results.

use std::fmt;

use serde::Serialize;

use super::aggregator::PeriodResult;
use super::ledger::CreditBalance;

/// Aggregate figures over every period that produced a result.
///
/// Derived from the result list rather than tracked during the fold, so the
/// summary always agrees with the per-period rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingSummary {
    /// Closed periods with a result.
    pub closed_periods: usize,
    /// Sum of closed-period net consumption (kWh).
    pub total_net_kwh: f64,
    /// Sum of closed-period bill totals.
    pub total_billed: f64,
    /// Sum of closed-period amounts due after monetary credit.
    pub total_due: f64,
    /// Total energy credit consumed by closed periods (kWh).
    pub total_credit_applied_kwh: f64,
    /// Balance carried into the open period.
    pub carried: CreditBalance,
    /// Projected bill total of the open period, when one could be computed.
    pub projected_cost: Option<f64>,
}

impl BillingSummary {
    /// Computes the summary from results in period order.
    pub fn from_results(results: &[PeriodResult], carried: CreditBalance) -> Self {
        let closed: Vec<&PeriodResult> = results.iter().filter(|r| !r.is_open).collect();
        Self {
            closed_periods: closed.len(),
            total_net_kwh: closed.iter().map(|r| r.net_consumption_kwh).sum(),
            total_billed: closed.iter().map(|r| r.estimated_cost).sum(),
            total_due: closed.iter().map(|r| r.amount_due).sum(),
            total_credit_applied_kwh: closed.iter().map(|r| r.credit_applied_kwh).sum(),
            carried,
            projected_cost: results.iter().find(|r| r.is_open).map(|r| r.estimated_cost),
        }
    }
}

impl fmt::Display for BillingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Billing Summary ---")?;
        writeln!(f, "Closed periods:        {}", self.closed_periods)?;
        writeln!(f, "Net consumption:       {:.2} kWh", self.total_net_kwh)?;
        writeln!(f, "Billed:                ${:.2}", self.total_billed)?;
        writeln!(f, "Due after cash credit: ${:.2}", self.total_due)?;
        writeln!(
            f,
            "Credit applied:        {:.2} kWh",
            self.total_credit_applied_kwh
        )?;
        writeln!(
            f,
            "Carried credit:        {:.2} kWh / ${:.2}",
            self.carried.energy_kwh, self.carried.cash
        )?;
        match self.projected_cost {
            Some(cost) => write!(f, "Open period estimate:  ${cost:.2}"),
            None => write!(f, "Open period estimate:  n/a"),
        }
    }
}
