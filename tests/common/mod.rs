//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use bimestre::reading::Reading;
use chrono::{Days, NaiveDate};

/// Calendar day in 2025.
pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid test date")
}

/// `days` after 2025-01-01 (day 1 is 2025-01-01).
pub fn day(n: u64) -> NaiveDate {
    date(1, 1)
        .checked_add_days(Days::new(n - 1))
        .expect("valid test date")
}

/// Builds a reading with sequential-looking fields.
pub fn reading(id: u64, on: NaiveDate, drawn: f64, injected: f64, cut: bool) -> Reading {
    Reading::new(id, on, drawn, injected, cut)
}

/// Three closed periods (surplus, covered, partial) followed by an open one.
///
/// Nets: -30, 20, 250; open period observes 50 kWh over 10 days.
pub fn year_of_readings() -> Vec<Reading> {
    vec![
        reading(1, date(1, 1), 1000.0, 500.0, true),
        reading(2, date(2, 1), 1060.0, 560.0, false),
        reading(3, date(3, 2), 1100.0, 630.0, true),
        reading(4, date(5, 1), 1140.0, 650.0, true),
        reading(5, date(6, 1), 1300.0, 700.0, false),
        reading(6, date(7, 1), 1440.0, 700.0, true),
        reading(7, date(7, 11), 1500.0, 710.0, false),
    ]
}

/// Reference day for [`year_of_readings`]: the trailing period is open.
pub fn year_today() -> NaiveDate {
    date(7, 12)
}
