//! Per-period aggregation: raw deltas, tariff costing, credit application
//! and open-period extrapolation.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::ledger::{CreditBalance, CreditLedger, LedgerEntry};
use super::period::Period;
use super::tariff::TariffBreakdown;
use crate::reading::Reading;

/// Nominal length of a billing cycle in days.
pub const DEFAULT_CYCLE_DAYS: u32 = 60;

/// Meter deltas observed between the first and last reading of a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodDeltas {
    /// Date of the earliest reading in the period.
    pub first_date: NaiveDate,
    /// Date of the latest reading in the period.
    pub last_date: NaiveDate,
    /// Number of readings within the period.
    pub reading_count: usize,
    /// Energy drawn between the extreme readings (kWh).
    pub drawn_kwh: f64,
    /// Energy injected between the extreme readings (kWh).
    pub injected_kwh: f64,
}

impl PeriodDeltas {
    /// Extracts the deltas of `period`, or `None` with fewer than two readings.
    pub fn observe(period: &Period, readings: &[Reading]) -> Option<Self> {
        let inside = period.readings(readings);
        let (first, last) = match inside.as_slice() {
            [first, .., last] => (*first, *last),
            _ => return None,
        };
        Some(Self {
            first_date: first.date,
            last_date: last.date,
            reading_count: inside.len(),
            drawn_kwh: last.drawn_since(first),
            injected_kwh: last.injected_since(first),
        })
    }

    /// Drawn minus injected (kWh, signed).
    pub fn net_kwh(&self) -> f64 {
        self.drawn_kwh - self.injected_kwh
    }

    /// Days between the first and last reading.
    pub fn elapsed_days(&self) -> i64 {
        (self.last_date - self.first_date).num_days()
    }
}

/// Billing outcome of one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodResult {
    /// Period label.
    pub label: String,
    /// Zero-based period index.
    pub index: usize,
    /// Whether the result is a projection for the open period.
    pub is_open: bool,
    /// Observed meter deltas.
    pub observed: PeriodDeltas,
    /// Scale applied to the observed deltas (`cycle_days / elapsed_days`);
    /// `None` for closed periods.
    pub extrapolation_factor: Option<f64>,
    /// Net consumption used for billing: observed for closed periods,
    /// extrapolated for the open one (kWh, signed).
    pub net_consumption_kwh: f64,
    /// Bill total including tax.
    pub estimated_cost: f64,
    /// Energy credit consumed (kWh).
    pub credit_applied_kwh: f64,
    /// Energy credit left after this period (kWh).
    pub credit_remaining_kwh: f64,
    /// Monetary credit consumed.
    pub cash_applied: f64,
    /// Monetary credit left after this period.
    pub cash_remaining: f64,
    /// Bill total minus monetary credit applied.
    pub amount_due: f64,
    /// Tariff costing.
    pub bill: TariffBreakdown,
    /// Human-readable breakdown.
    pub detail: String,
}

impl PeriodResult {
    fn from_entry(
        period: &Period,
        observed: PeriodDeltas,
        extrapolation_factor: Option<f64>,
        entry: LedgerEntry,
    ) -> Self {
        let mut detail = String::new();
        if let Some(factor) = extrapolation_factor {
            detail.push_str(&format!(
                "projected from {} days (x{factor:.2}); ",
                observed.elapsed_days()
            ));
        }
        if entry.credit_applied_kwh > 0.0 {
            detail.push_str(&format!(
                "credit applied: {:.2} kWh; ",
                entry.credit_applied_kwh
            ));
        }
        if entry.credit_forfeited_kwh > 0.0 {
            detail.push_str(&format!(
                "credit forfeited: {:.2} kWh; ",
                entry.credit_forfeited_kwh
            ));
        }
        detail.push_str(&entry.bill.detail());
        detail.push_str(&format!(" + tax ${:.2}", entry.bill.tax));
        if entry.cash_applied > 0.0 {
            detail.push_str(&format!("; cash credit applied: ${:.2}", entry.cash_applied));
        }

        Self {
            label: period.label.clone(),
            index: period.index,
            is_open: period.is_open,
            observed,
            extrapolation_factor,
            net_consumption_kwh: entry.net_kwh,
            estimated_cost: entry.bill.total,
            credit_applied_kwh: entry.credit_applied_kwh,
            credit_remaining_kwh: entry.balance_after.energy_kwh,
            cash_applied: entry.cash_applied,
            cash_remaining: entry.balance_after.cash,
            amount_due: entry.amount_due,
            bill: entry.bill,
            detail,
        }
    }
}

impl fmt::Display for PeriodResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{}",
            self.label,
            if self.is_open { " (projection)" } else { "" }
        )?;
        writeln!(
            f,
            "  Net consumption:   {:.2} kWh (observed {:.2} kWh over {} days)",
            self.net_consumption_kwh,
            self.observed.net_kwh(),
            self.observed.elapsed_days()
        )?;
        writeln!(f, "  Detail:            {}", self.detail)?;
        writeln!(f, "  Tax:               ${:.2}", self.bill.tax)?;
        writeln!(f, "  Estimated total:   ${:.2}", self.estimated_cost)?;
        if self.cash_applied > 0.0 || self.cash_remaining > 0.0 {
            writeln!(
                f,
                "  Amount due:        ${:.2} (cash credit left ${:.2})",
                self.amount_due, self.cash_remaining
            )?;
        }
        write!(f, "  Credit remaining:  {:.0} kWh", self.credit_remaining_kwh)
    }
}

/// Results for a run of periods plus the balance carried out of the last
/// closed period.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One result per period with enough data, in period order.
    pub results: Vec<PeriodResult>,
    /// Ledger balance after the last closed period.
    pub carried: CreditBalance,
}

/// Orchestrates deltas, ledger and tariff for each period.
#[derive(Debug, Clone)]
pub struct PeriodAggregator {
    ledger: CreditLedger,
    cycle_days: u32,
}

impl PeriodAggregator {
    /// Creates an aggregator extrapolating open periods to `cycle_days`.
    pub fn new(ledger: CreditLedger, cycle_days: u32) -> Self {
        Self { ledger, cycle_days }
    }

    /// The ledger used for costing.
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Nominal cycle length used for extrapolation.
    pub fn cycle_days(&self) -> u32 {
        self.cycle_days
    }

    /// Computes results for every period, folding the ledger over closed
    /// periods in order.
    pub fn aggregate(&self, periods: &[Period], readings: &[Reading]) -> Aggregation {
        let mut balance = CreditBalance::default();
        let mut results = Vec::new();

        for period in periods.iter().filter(|p| !p.is_open) {
            let Some(observed) = PeriodDeltas::observe(period, readings) else {
                debug!(period = %period.label, "skipping closed period: fewer than 2 readings");
                continue;
            };
            let entry = self.ledger.step(balance, observed.net_kwh());
            balance = entry.balance_after;
            results.push(PeriodResult::from_entry(period, observed, None, entry));
        }

        let carried = balance;
        if let Some(open) = periods.iter().find(|p| p.is_open) {
            if let Some(result) = self.project_open(open, readings, carried) {
                results.push(result);
            }
        }

        results.sort_by_key(|r| r.index);
        Aggregation { results, carried }
    }

    /// Costs the open period from extrapolated deltas against a snapshot of
    /// the carried balance.
    fn project_open(
        &self,
        period: &Period,
        readings: &[Reading],
        carried: CreditBalance,
    ) -> Option<PeriodResult> {
        let Some(observed) = PeriodDeltas::observe(period, readings) else {
            debug!(period = %period.label, "no projection: fewer than 2 readings");
            return None;
        };
        let elapsed = observed.elapsed_days();
        if elapsed <= 0 {
            debug!(period = %period.label, "no projection: zero elapsed days");
            return None;
        }

        let factor = f64::from(self.cycle_days) / elapsed as f64;
        let net = observed.drawn_kwh * factor - observed.injected_kwh * factor;
        let entry = self.ledger.step(carried, net);
        Some(PeriodResult::from_entry(period, observed, Some(factor), entry))
    }
}

impl Default for PeriodAggregator {
    fn default() -> Self {
        Self::new(CreditLedger::default(), DEFAULT_CYCLE_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::period::partition;

    const EPS: f64 = 1e-9;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn reading(id: u64, on: NaiveDate, drawn: f64, injected: f64, cut: bool) -> Reading {
        Reading::new(id, on, drawn, injected, cut)
    }

    #[test]
    fn closed_period_two_tiers() {
        let readings = vec![
            reading(1, date(1, 1), 100.0, 0.0, true),
            reading(2, date(3, 2), 400.0, 50.0, true),
        ];
        let periods = partition(&readings, date(3, 2));
        let agg = PeriodAggregator::default().aggregate(&periods, &readings);
        assert_eq!(agg.results.len(), 1);
        let r = &agg.results[0];
        assert_eq!(r.net_consumption_kwh, 250.0);
        assert!((r.bill.subtotal - 274.50).abs() < EPS);
        assert!((r.estimated_cost - 318.42).abs() < EPS);
        assert_eq!(r.extrapolation_factor, None);
    }

    #[test]
    fn surplus_credit_carries_into_next_period() {
        let readings = vec![
            reading(1, date(1, 1), 0.0, 0.0, true),
            reading(2, date(3, 1), 100.0, 130.0, true),
            reading(3, date(5, 1), 120.0, 130.0, true),
        ];
        let periods = partition(&readings, date(5, 1));
        let agg = PeriodAggregator::default().aggregate(&periods, &readings);
        assert_eq!(agg.results.len(), 2);
        assert_eq!(agg.results[0].net_consumption_kwh, -30.0);
        assert_eq!(agg.results[0].credit_remaining_kwh, 30.0);
        assert!((agg.results[1].estimated_cost - 147.32).abs() < EPS);
        assert!((agg.results[1].credit_remaining_kwh - 10.0).abs() < EPS);
        assert!((agg.carried.energy_kwh - 10.0).abs() < EPS);
    }

    #[test]
    fn open_period_is_extrapolated_to_cycle() {
        let readings = vec![
            reading(1, date(1, 1), 1000.0, 200.0, true),
            reading(2, date(1, 11), 1060.0, 210.0, false),
        ];
        let periods = partition(&readings, date(1, 12));
        let agg = PeriodAggregator::default().aggregate(&periods, &readings);
        let r = &agg.results[0];
        assert!(r.is_open);
        assert_eq!(r.extrapolation_factor, Some(6.0));
        assert!((r.net_consumption_kwh - 300.0).abs() < EPS);
        let quantities: Vec<f64> = r.bill.tiers.iter().map(|t| t.quantity_kwh).collect();
        assert_eq!(quantities, vec![150.0, 150.0, 0.0]);
    }

    #[test]
    fn open_period_uses_carried_credit_without_mutating_it() {
        let readings = vec![
            reading(1, date(1, 1), 0.0, 0.0, true),
            reading(2, date(3, 1), 0.0, 40.0, true),
            reading(3, date(3, 31), 20.0, 40.0, false),
        ];
        let periods = partition(&readings, date(4, 1));
        let agg = PeriodAggregator::default().aggregate(&periods, &readings);
        assert_eq!(agg.carried.energy_kwh, 40.0);
        let open = &agg.results[1];
        // 20 kWh over 30 days -> 40 kWh projected, fully covered.
        assert!((open.net_consumption_kwh - 40.0).abs() < EPS);
        assert!((open.credit_applied_kwh - 40.0).abs() < EPS);
        assert!(open.credit_remaining_kwh.abs() < EPS);
        assert_eq!(agg.carried.energy_kwh, 40.0);
    }

    #[test]
    fn zero_elapsed_days_is_insufficient_data() {
        let readings = vec![
            reading(1, date(1, 1), 0.0, 0.0, true),
            reading(2, date(1, 1), 5.0, 0.0, false),
        ];
        let periods = partition(&readings, date(1, 5));
        let agg = PeriodAggregator::default().aggregate(&periods, &readings);
        assert!(agg.results.is_empty());
    }

    #[test]
    fn single_reading_period_is_skipped() {
        let readings = vec![reading(1, date(1, 1), 0.0, 0.0, true)];
        let periods = partition(&readings, date(1, 20));
        assert_eq!(periods.len(), 1);
        let agg = PeriodAggregator::default().aggregate(&periods, &readings);
        assert!(agg.results.is_empty());
        assert_eq!(agg.carried, CreditBalance::default());
    }

    #[test]
    fn results_follow_period_order_with_open_last() {
        let readings = vec![
            reading(1, date(1, 1), 0.0, 0.0, true),
            reading(2, date(3, 1), 50.0, 90.0, true),
            reading(3, date(5, 1), 300.0, 100.0, true),
            reading(4, date(5, 21), 340.0, 110.0, false),
        ];
        let periods = partition(&readings, date(5, 25));
        let aggregator = PeriodAggregator::default();
        assert_eq!(aggregator.ledger(), &CreditLedger::default());
        let all = aggregator.aggregate(&periods, &readings);
        let indices: Vec<usize> = all.results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(all.results[2].is_open);
        // The open period never feeds the carried balance.
        assert_eq!(all.carried.energy_kwh, all.results[1].credit_remaining_kwh);
        assert_eq!(all.carried.cash, all.results[1].cash_remaining);
    }

    #[test]
    fn observed_net_matches_extreme_readings() {
        let readings = vec![
            reading(1, date(1, 1), 10.0, 1.0, true),
            reading(2, date(1, 20), 30.0, 9.0, false),
            reading(3, date(2, 10), 55.0, 12.0, false),
            reading(4, date(3, 1), 80.0, 20.0, true),
        ];
        let periods = partition(&readings, date(3, 1));
        let deltas = PeriodDeltas::observe(&periods[0], &readings).unwrap();
        assert_eq!(deltas.reading_count, 4);
        assert_eq!(deltas.net_kwh(), (80.0 - 10.0) - (20.0 - 1.0));
    }
}
