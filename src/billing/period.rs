//! Period partitioning: billing cycles derived from cut-marker readings.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::reading::{self, Reading};

/// One billing cycle ("bimestre") bounded by two cut readings, or by the
/// last cut reading and today when still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    /// Display label, unique among the periods of one partition.
    pub label: String,
    /// First day of the period (a cut reading date).
    pub start: NaiveDate,
    /// Last day of the period (next cut reading date, or today when open).
    pub end: NaiveDate,
    /// Zero-based position among all periods.
    pub index: usize,
    /// True only for the trailing period that ends today.
    pub is_open: bool,
}

impl Period {
    /// Whether `date` falls within `[start, end]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Readings dated within this period, in input order.
    pub fn readings<'a>(&self, readings: &'a [Reading]) -> Vec<&'a Reading> {
        reading::within(readings, self.start, self.end)
    }

    /// Length of the period in days.
    pub fn length_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}  {} days{}",
            self.index,
            self.label,
            self.length_days(),
            if self.is_open { "  (open)" } else { "" }
        )
    }
}

/// How the caller picks the period to display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PeriodSelector {
    /// The period containing today, else the most recent one.
    #[default]
    Today,
    /// Explicit zero-based sequence index.
    Index(usize),
    /// Explicit period label.
    Label(String),
}

impl PeriodSelector {
    /// Interprets a CLI/query value: a bare integer is an index, anything else a label.
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<usize>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Label(value.to_string()),
        }
    }
}

/// Derives the billing periods from the cut markers in `readings`.
///
/// `readings` must be ordered by date ascending. Each adjacent pair of cut
/// dates yields a closed period; if the last cut is strictly before `today`
/// an open period running to `today` is appended. Without any cut marker
/// the result is empty.
pub fn partition(readings: &[Reading], today: NaiveDate) -> Vec<Period> {
    let cuts: Vec<NaiveDate> = readings
        .iter()
        .filter(|r| r.is_cut_marker)
        .map(|r| r.date)
        .collect();

    let mut periods: Vec<Period> = cuts
        .windows(2)
        .enumerate()
        .map(|(index, pair)| Period {
            label: format!("Period {} ({} - {})", index + 1, pair[0], pair[1]),
            start: pair[0],
            end: pair[1],
            index,
            is_open: false,
        })
        .collect();

    if let Some(&last_cut) = cuts.last() {
        if today > last_cut {
            periods.push(Period {
                label: format!("Current period ({last_cut} - today)"),
                start: last_cut,
                end: today,
                index: periods.len(),
                is_open: true,
            });
        }
    }

    periods
}

/// Index of the period containing `today`, falling back to the last period.
pub fn active_index(periods: &[Period], today: NaiveDate) -> Option<usize> {
    periods
        .iter()
        .position(|p| p.contains(today))
        .or_else(|| periods.len().checked_sub(1))
}

/// Resolves a selector against a partition. Unknown indices/labels yield `None`.
pub fn select(periods: &[Period], selector: &PeriodSelector, today: NaiveDate) -> Option<usize> {
    match selector {
        PeriodSelector::Today => active_index(periods, today),
        PeriodSelector::Index(index) => (*index < periods.len()).then_some(*index),
        PeriodSelector::Label(label) => periods.iter().position(|p| &p.label == label),
    }
}
