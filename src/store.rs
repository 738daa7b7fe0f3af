//! Reading storage boundary.
//!
//! The billing core never performs I/O; callers fetch readings through a
//! [`ReadingStore`] once, then hand the list to the engine.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::reading::{NewReading, Reading, sorted_by_date};

/// Column header of the reading CSV file.
pub const CSV_HEADER: &str = "id,date,energy_drawn,energy_injected,is_cut_marker,note";

/// Failures surfaced by a reading store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access reading store \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed reading data: {0}")]
    Csv(#[from] csv::Error),
    #[error("duplicate reading id {0}")]
    DuplicateId(u64),
    #[error("reading dated {date} precedes the latest stored reading ({latest})")]
    OutOfOrder { date: NaiveDate, latest: NaiveDate },
}

/// Source of meter readings.
pub trait ReadingStore {
    /// Returns every stored reading ordered by date ascending.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the backing storage cannot be read.
    fn fetch(&self) -> Result<Vec<Reading>, StoreError>;

    /// Appends a reading, assigning the next id.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the reading is dated before the latest
    /// stored reading or the storage cannot be written.
    fn append(&mut self, reading: NewReading) -> Result<Reading, StoreError>;
}

/// Checks the append-only ordering and returns the id for the next reading.
fn next_id(existing: &[Reading], candidate: &NewReading) -> Result<u64, StoreError> {
    if let Some(latest) = existing.iter().map(|r| r.date).max() {
        if candidate.date < latest {
            return Err(StoreError::OutOfOrder {
                date: candidate.date,
                latest,
            });
        }
    }
    Ok(existing.iter().map(|r| r.id).max().map_or(1, |id| id + 1))
}

fn check_unique_ids(readings: &[Reading]) -> Result<(), StoreError> {
    let mut ids: Vec<u64> = readings.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    match ids.windows(2).find(|w| w[0] == w[1]) {
        Some(w) => Err(StoreError::DuplicateId(w[0])),
        None => Ok(()),
    }
}

/// Parses readings from CSV with the [`CSV_HEADER`] columns.
///
/// # Errors
///
/// Returns a `StoreError` on malformed rows or duplicate ids.
pub fn read_csv(reader: impl Read) -> Result<Vec<Reading>, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let readings = rdr
        .deserialize::<Reading>()
        .collect::<Result<Vec<_>, _>>()?;
    check_unique_ids(&readings)?;
    Ok(sorted_by_date(&readings))
}

/// Writes readings as CSV with the [`CSV_HEADER`] columns.
///
/// # Errors
///
/// Returns a `StoreError` if writing fails.
pub fn write_csv(readings: &[Reading], writer: impl Write) -> Result<(), StoreError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER.split(','))?;
    for r in readings {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Reading store backed by a CSV file, rewritten in full on append.
#[derive(Debug, Clone)]
pub struct CsvReadingStore {
    path: PathBuf,
}

impl CsvReadingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ReadingStore for CsvReadingStore {
    fn fetch(&self) -> Result<Vec<Reading>, StoreError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let readings = read_csv(io::BufReader::new(file))?;
        debug!(path = %self.path.display(), count = readings.len(), "fetched readings");
        Ok(readings)
    }

    fn append(&mut self, reading: NewReading) -> Result<Reading, StoreError> {
        let mut readings = if self.path.exists() {
            self.fetch()?
        } else {
            Vec::new()
        };
        let id = next_id(&readings, &reading)?;
        let stored = reading.with_id(id);
        readings.push(stored.clone());

        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        write_csv(&readings, io::BufWriter::new(file))?;
        debug!(path = %self.path.display(), id, "appended reading");
        Ok(stored)
    }
}

/// In-memory reading store.
#[derive(Debug, Clone, Default)]
pub struct MemoryReadingStore {
    readings: Vec<Reading>,
}

impl MemoryReadingStore {
    /// Creates a store seeded with `readings`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateId` if two readings share an id.
    pub fn with_readings(readings: Vec<Reading>) -> Result<Self, StoreError> {
        check_unique_ids(&readings)?;
        Ok(Self { readings })
    }
}

impl ReadingStore for MemoryReadingStore {
    fn fetch(&self) -> Result<Vec<Reading>, StoreError> {
        Ok(sorted_by_date(&self.readings))
    }

    fn append(&mut self, reading: NewReading) -> Result<Reading, StoreError> {
        let id = next_id(&self.readings, &reading)?;
        let stored = reading.with_id(id);
        self.readings.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn new_reading(on: NaiveDate, drawn: f64, cut: bool) -> NewReading {
        NewReading {
            date: on,
            energy_drawn: drawn,
            energy_injected: 0.0,
            is_cut_marker: cut,
            note: None,
        }
    }

    #[test]
    fn parses_csv_and_sorts_by_date() {
        let data = "\
id,date,energy_drawn,energy_injected,is_cut_marker,note
2,2025-03-01,400,50,true,
1,2025-01-01,100,0,true,first cut
";
        let readings = read_csv(data.as_bytes()).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].id, 1);
        assert_eq!(readings[0].note.as_deref(), Some("first cut"));
        assert_eq!(readings[1].note, None);
        assert!(readings[1].is_cut_marker);
    }

    #[test]
    fn note_column_may_be_omitted() {
        let data = "\
id,date,energy_drawn,energy_injected,is_cut_marker,note
1,2025-01-01,100,0,true
2,2025-03-01,400,50,true,meter swapped
";
        let readings = read_csv(data.as_bytes()).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].note, None);
        assert_eq!(readings[1].note.as_deref(), Some("meter swapped"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let data = "\
id,date,energy_drawn,energy_injected,is_cut_marker,note
1,2025-01-01,100,0,true,
1,2025-03-01,400,50,true,
";
        assert!(matches!(
            read_csv(data.as_bytes()),
            Err(StoreError::DuplicateId(1))
        ));
    }

    #[test]
    fn rejects_malformed_rows() {
        let data = "\
id,date,energy_drawn,energy_injected,is_cut_marker,note
1,not-a-date,100,0,true,
";
        assert!(matches!(read_csv(data.as_bytes()), Err(StoreError::Csv(_))));
    }

    #[test]
    fn written_csv_reads_back() {
        let mut r = Reading::new(1, date(1, 1), 100.5, 2.0, true);
        r.note = Some("swap, then check".to_string());
        let readings = vec![r, Reading::new(2, date(2, 1), 180.0, 9.5, false)];
        let mut buf = Vec::new();
        write_csv(&readings, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().next(), Some(CSV_HEADER));
        assert_eq!(read_csv(text.as_bytes()).unwrap(), readings);
    }

    #[test]
    fn memory_store_assigns_ids_and_rejects_backdating() {
        let mut store = MemoryReadingStore::default();
        let first = store.append(new_reading(date(1, 1), 10.0, true)).unwrap();
        let second = store.append(new_reading(date(1, 5), 20.0, false)).unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let err = store.append(new_reading(date(1, 2), 15.0, false));
        assert!(matches!(err, Err(StoreError::OutOfOrder { .. })));
        assert_eq!(store.fetch().unwrap().len(), 2);
    }

    #[test]
    fn csv_store_missing_file_is_an_error() {
        let store = CsvReadingStore::new(std::env::temp_dir().join("bimestre-missing.csv"));
        assert!(matches!(store.fetch(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn csv_store_append_creates_and_extends_file() {
        let path = std::env::temp_dir().join(format!(
            "bimestre-store-{}.csv",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let mut store = CsvReadingStore::new(&path);
        assert_eq!(store.path(), path.as_path());
        store.append(new_reading(date(1, 1), 10.0, true)).unwrap();
        let stored = store.append(new_reading(date(3, 1), 90.0, true)).unwrap();
        assert_eq!(stored.id, 2);

        let readings = store.fetch().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].energy_drawn, 90.0);

        let _ = std::fs::remove_file(&path);
    }
}
