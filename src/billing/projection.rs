//! Cumulative net-consumption series for charting, with a naive linear
//! extension to the end of the cycle while the period is open.

use chrono::NaiveDate;
use serde::Serialize;

use super::period::Period;
use crate::reading::Reading;

/// Whether a point comes from readings or from the linear extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Actual,
    Projected,
}

/// One point of the cumulative series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// X-axis label: the reading date, or `Day N` for projected points.
    pub label: String,
    /// Days since the first reading of the period.
    pub day: i64,
    /// Reading date for actual points.
    pub date: Option<NaiveDate>,
    /// Running net consumption since the first reading (kWh).
    pub cumulative_net_kwh: f64,
    pub kind: PointKind,
}

/// Builds the series for `period`.
///
/// One actual point per reading after the first; for an open period,
/// projected points for each remaining day up to `cycle_days` at the
/// average daily net observed so far. Fewer than two readings give an
/// empty series.
pub fn build(period: &Period, readings: &[Reading], cycle_days: u32) -> Vec<SeriesPoint> {
    let inside = period.readings(readings);
    let Some(first) = inside.first() else {
        return Vec::new();
    };

    let mut points: Vec<SeriesPoint> = Vec::with_capacity(inside.len());
    let mut cumulative = 0.0_f64;
    for pair in inside.windows(2) {
        cumulative += pair[1].net_since(pair[0]);
        points.push(SeriesPoint {
            label: pair[1].date.to_string(),
            day: (pair[1].date - first.date).num_days(),
            date: Some(pair[1].date),
            cumulative_net_kwh: cumulative,
            kind: PointKind::Actual,
        });
    }

    if !period.is_open {
        return points;
    }
    let last_day = match points.last() {
        Some(p) if p.day > 0 => p.day,
        _ => return points,
    };

    let per_day = cumulative / last_day as f64;
    for day in (last_day + 1)..=i64::from(cycle_days) {
        cumulative += per_day;
        points.push(SeriesPoint {
            label: format!("Day {day}"),
            day,
            date: None,
            cumulative_net_kwh: cumulative,
            kind: PointKind::Projected,
        });
    }
    points
}
