//! Meter readings: the append-only input log of the billing engine.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One snapshot of the bidirectional meter.
///
/// Both energy registers are cumulative counters, so consumption over an
/// interval is the difference between two readings, never a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unique identifier assigned by the reading store.
    pub id: u64,
    /// Calendar day the meter was read.
    pub date: NaiveDate,
    /// Cumulative energy drawn from the grid (kWh).
    pub energy_drawn: f64,
    /// Cumulative energy injected back to the grid (kWh).
    pub energy_injected: f64,
    /// Whether this reading is the utility's billing cutoff.
    pub is_cut_marker: bool,
    /// Free-text observation.
    #[serde(default)]
    pub note: Option<String>,
}

impl Reading {
    /// Creates a reading without a note.
    pub fn new(
        id: u64,
        date: NaiveDate,
        energy_drawn: f64,
        energy_injected: f64,
        is_cut_marker: bool,
    ) -> Self {
        Self {
            id,
            date,
            energy_drawn,
            energy_injected,
            is_cut_marker,
            note: None,
        }
    }

    /// Net energy (drawn minus injected) accumulated between `earlier` and `self`.
    pub fn net_since(&self, earlier: &Reading) -> f64 {
        self.drawn_since(earlier) - self.injected_since(earlier)
    }

    /// Energy drawn between `earlier` and `self`.
    pub fn drawn_since(&self, earlier: &Reading) -> f64 {
        self.energy_drawn - earlier.energy_drawn
    }

    /// Energy injected between `earlier` and `self`.
    pub fn injected_since(&self, earlier: &Reading) -> f64 {
        self.energy_injected - earlier.energy_injected
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<4} {} | drawn={:>9.1} kWh  injected={:>9.1} kWh{}",
            self.id,
            self.date,
            self.energy_drawn,
            self.energy_injected,
            if self.is_cut_marker { "  [cut]" } else { "" },
        )?;
        if let Some(note) = &self.note {
            write!(f, "  ({note})")?;
        }
        Ok(())
    }
}

/// A reading submitted for storage, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub date: NaiveDate,
    pub energy_drawn: f64,
    pub energy_injected: f64,
    pub is_cut_marker: bool,
    pub note: Option<String>,
}

impl NewReading {
    /// Attaches the store-assigned id.
    pub fn with_id(self, id: u64) -> Reading {
        Reading {
            id,
            date: self.date,
            energy_drawn: self.energy_drawn,
            energy_injected: self.energy_injected,
            is_cut_marker: self.is_cut_marker,
            note: self.note,
        }
    }
}

/// Returns the readings ordered by date ascending, ties broken by id.
///
/// The sort is stable, so already-ordered input is returned unchanged.
pub fn sorted_by_date(readings: &[Reading]) -> Vec<Reading> {
    let mut sorted = readings.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    sorted
}

/// Readings whose date falls within `[start, end]`, both ends inclusive.
pub fn within(readings: &[Reading], start: NaiveDate, end: NaiveDate) -> Vec<&Reading> {
    readings
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect()
}
