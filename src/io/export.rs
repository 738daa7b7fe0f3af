//! CSV export for period results and projection series.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::billing::aggregator::PeriodResult;
use crate::billing::projection::{PointKind, SeriesPoint};

/// Column header for period-result export.
const RESULTS_HEADER: &str = "index,label,is_open,first_date,last_date,elapsed_days,\
                              drawn_kwh,injected_kwh,observed_net_kwh,extrapolation_factor,\
                              net_consumption_kwh,subtotal,tax,total,credit_applied_kwh,\
                              credit_remaining_kwh,cash_applied,cash_remaining,amount_due,detail";

/// Column header for projection-series export.
const PROJECTION_HEADER: &str = "label,day,date,cumulative_net_kwh,kind";

/// Exports period results to a CSV file at the given path.
///
/// Writes a header row followed by one row per result. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_results_csv(results: &[PeriodResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_results_csv(results, io::BufWriter::new(file))
}

/// Writes period results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_results_csv(results: &[PeriodResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(RESULTS_HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.index.to_string(),
            r.label.clone(),
            r.is_open.to_string(),
            r.observed.first_date.to_string(),
            r.observed.last_date.to_string(),
            r.observed.elapsed_days().to_string(),
            format!("{:.4}", r.observed.drawn_kwh),
            format!("{:.4}", r.observed.injected_kwh),
            format!("{:.4}", r.observed.net_kwh()),
            r.extrapolation_factor
                .map(|f| format!("{f:.4}"))
                .unwrap_or_default(),
            format!("{:.4}", r.net_consumption_kwh),
            format!("{:.2}", r.bill.subtotal),
            format!("{:.2}", r.bill.tax),
            format!("{:.2}", r.estimated_cost),
            format!("{:.4}", r.credit_applied_kwh),
            format!("{:.4}", r.credit_remaining_kwh),
            format!("{:.2}", r.cash_applied),
            format!("{:.2}", r.cash_remaining),
            format!("{:.2}", r.amount_due),
            r.detail.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a projection series to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_projection_csv(points: &[SeriesPoint], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_projection_csv(points, io::BufWriter::new(file))
}

/// Writes a projection series as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_projection_csv(points: &[SeriesPoint], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(PROJECTION_HEADER.split(','))?;
    for p in points {
        wtr.write_record(&[
            p.label.clone(),
            p.day.to_string(),
            p.date.map(|d| d.to_string()).unwrap_or_default(),
            format!("{:.4}", p.cumulative_net_kwh),
            match p.kind {
                PointKind::Actual => "actual".to_string(),
                PointKind::Projected => "projected".to_string(),
            },
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
