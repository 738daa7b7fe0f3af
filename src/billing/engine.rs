//! Recompute entry point: readings and today in, every derived billing view out.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::aggregator::{PeriodAggregator, PeriodResult};
use super::ledger::CreditBalance;
use super::period::{self, Period, PeriodSelector};
use super::projection::{self, SeriesPoint};
use super::summary::BillingSummary;
use crate::config::BillingConfig;
use crate::reading::{Reading, sorted_by_date};

/// Everything derived from one reading set.
///
/// Never persisted; build a new one whenever the readings change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recomputation {
    /// Reference day for open-period detection.
    pub today: NaiveDate,
    /// Derived periods in sequence order.
    pub periods: Vec<Period>,
    /// Index of the selected period, `None` when there are no periods or the
    /// explicit selection did not match.
    pub active: Option<usize>,
    /// Results for every period with enough data.
    pub results: Vec<PeriodResult>,
    /// Ledger balance after the last closed period.
    pub carried: CreditBalance,
    /// Cumulative series of the active period.
    pub projection: Vec<SeriesPoint>,
    /// Totals over all results.
    pub summary: BillingSummary,
}

impl Recomputation {
    /// The selected period.
    pub fn active_period(&self) -> Option<&Period> {
        self.active.and_then(|i| self.periods.get(i))
    }

    /// Result of the selected period, `None` on insufficient data.
    pub fn active_result(&self) -> Option<&PeriodResult> {
        self.active.and_then(|i| self.result(i))
    }

    /// Result of the period at `index`.
    pub fn result(&self, index: usize) -> Option<&PeriodResult> {
        self.results.iter().find(|r| r.index == index)
    }

    /// Whether any period could be derived.
    pub fn has_data(&self) -> bool {
        !self.periods.is_empty()
    }
}

/// Billing engine configured once and invoked per reading-set change.
///
/// # Examples
///
/// ```
/// use bimestre::billing::engine::BillingEngine;
/// use bimestre::reading::Reading;
/// use chrono::NaiveDate;
///
/// let d = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
/// let readings = vec![
///     Reading::new(1, d(1, 1), 100.0, 0.0, true),
///     Reading::new(2, d(3, 2), 400.0, 50.0, true),
/// ];
/// let out = BillingEngine::default().recompute(&readings, d(3, 2));
/// assert_eq!(out.periods.len(), 1);
/// assert_eq!(out.results[0].net_consumption_kwh, 250.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BillingEngine {
    aggregator: PeriodAggregator,
}

impl BillingEngine {
    pub fn new(aggregator: PeriodAggregator) -> Self {
        Self { aggregator }
    }

    /// Builds the engine described by a configuration.
    pub fn from_config(config: &BillingConfig) -> Self {
        Self::new(config.aggregator())
    }

    pub fn aggregator(&self) -> &PeriodAggregator {
        &self.aggregator
    }

    /// Recomputes with the period containing `today` selected.
    pub fn recompute(&self, readings: &[Reading], today: NaiveDate) -> Recomputation {
        self.recompute_with(readings, today, &PeriodSelector::Today)
    }

    /// Recomputes periods, results, projection and summary from scratch.
    ///
    /// `readings` may be in any order; they are sorted by date first.
    pub fn recompute_with(
        &self,
        readings: &[Reading],
        today: NaiveDate,
        selector: &PeriodSelector,
    ) -> Recomputation {
        let readings = sorted_by_date(readings);
        let periods = period::partition(&readings, today);
        if periods.is_empty() {
            debug!(readings = readings.len(), "no cut markers, nothing to bill");
        }

        let active = period::select(&periods, selector, today);
        let aggregation = self.aggregator.aggregate(&periods, &readings);
        let projection = active
            .and_then(|i| periods.get(i))
            .map(|p| projection::build(p, &readings, self.aggregator.cycle_days()))
            .unwrap_or_default();
        let summary = BillingSummary::from_results(&aggregation.results, aggregation.carried);

        info!(
            periods = periods.len(),
            results = aggregation.results.len(),
            carried_kwh = aggregation.carried.energy_kwh,
            total_billed = summary.total_billed,
            "recomputed billing"
        );

        Recomputation {
            today,
            periods,
            active,
            results: aggregation.results,
            carried: aggregation.carried,
            projection,
            summary,
        }
    }
}
