//! Row-by-row table decoding.
//!
//! Every feed table goes through [`RowDecoder`], which yields a `Result` per
//! row. Bad rows are skipped and counted in a [`TableReport`] rather than
//! aborting the table, so parse-error counts stay observable.

use std::io::Read;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::FeedError;

/// Number of individual row errors logged per table before going quiet.
const LOGGED_ROW_ERRORS: usize = 5;

/// A single row that failed to decode.
#[derive(Debug, thiserror::Error)]
#[error("{table} line {line}: {source}")]
pub struct RowError {
    pub table: &'static str,
    /// Line number in the file, or 0 when unknown.
    pub line: u64,
    #[source]
    pub source: csv::Error,
}

impl RowError {
    fn new(table: &'static str, source: csv::Error) -> Self {
        let line = source.position().map_or(0, |p| p.line());
        Self {
            table,
            line,
            source,
        }
    }
}

/// Decode counts for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub decoded: usize,
    pub skipped: usize,
}

impl TableReport {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            decoded: 0,
            skipped: 0,
        }
    }
}

/// Decodes rows of one comma-separated table by header name.
pub struct RowDecoder<R> {
    table: &'static str,
    reader: csv::Reader<R>,
}

impl<R: Read> RowDecoder<R> {
    /// Open a table, reading its header row.
    pub fn new(table: &'static str, input: R) -> Result<Self, FeedError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        reader.headers().map_err(|e| FeedError::Malformed {
            file: table,
            message: format!("unreadable header: {e}"),
        })?;

        Ok(Self { table, reader })
    }

    /// Fail unless the header names every listed column.
    pub fn require_columns(&mut self, columns: &[&str]) -> Result<(), FeedError> {
        let headers = self.reader.headers().map_err(|e| FeedError::Malformed {
            file: self.table,
            message: format!("unreadable header: {e}"),
        })?;

        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FeedError::Malformed {
                file: self.table,
                message: format!("missing columns: {}", missing.join(", ")),
            })
        }
    }

    /// Iterate the remaining rows, one result per row.
    pub fn rows<'a, T: DeserializeOwned + 'a>(
        &'a mut self,
    ) -> impl Iterator<Item = Result<T, RowError>> + 'a {
        let table = self.table;
        self.reader
            .deserialize::<T>()
            .map(move |row| row.map_err(|e| RowError::new(table, e)))
    }

    /// Decode every row, skipping and counting the ones that fail.
    pub fn decode_all<T: DeserializeOwned>(mut self) -> (Vec<T>, TableReport) {
        let mut report = TableReport::new(self.table);
        let mut decoded = Vec::new();

        for row in self.rows::<T>() {
            match row {
                Ok(value) => {
                    report.decoded += 1;
                    decoded.push(value);
                }
                Err(e) => {
                    report.skipped += 1;
                    if report.skipped <= LOGGED_ROW_ERRORS {
                        debug!(error = %e, "Skipping feed row");
                    }
                }
            }
        }

        if report.skipped > 0 {
            warn!(
                table = report.table,
                decoded = report.decoded,
                skipped = report.skipped,
                "Skipped malformed feed rows"
            );
        }

        (decoded, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::records::{CalendarException, ExceptionType, StopTime};

    #[test]
    fn decodes_by_column_name() {
        let csv = "stop_sequence,arrival_time,trip_id,stop_id,departure_time\n\
                   1,08:00:00,T1,S1,08:00:30\n";
        let decoder = RowDecoder::new("stop_times.txt", csv.as_bytes()).unwrap();
        let (rows, report) = decoder.decode_all::<StopTime>();

        assert_eq!(report.decoded, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(rows[0].trip_id, "T1");
        assert_eq!(rows[0].stop_sequence, 1);
        assert_eq!(rows[0].arrival_time.unwrap().to_string(), "08:00:00");
    }

    #[test]
    fn skips_and_counts_bad_rows() {
        let csv = "service_id,date,exception_type\n\
                   WKD,20260101,2\n\
                   WKD,not-a-date,1\n\
                   SAT,20260102,9\n\
                   SAT,20260103,1\n";
        let decoder = RowDecoder::new("calendar_dates.txt", csv.as_bytes()).unwrap();
        let (rows, report) = decoder.decode_all::<CalendarException>();

        assert_eq!(report.decoded, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(rows[0].exception_type, ExceptionType::Removed);
        assert_eq!(rows[1].exception_type, ExceptionType::Added);
    }

    #[test]
    fn rows_yield_errors_with_line_numbers() {
        let csv = "trip_id,stop_id,arrival_time,departure_time,stop_sequence\n\
                   T1,S1,08:00:00,08:00:00,x\n";
        let mut decoder = RowDecoder::new("stop_times.txt", csv.as_bytes()).unwrap();
        let results: Vec<_> = decoder.rows::<StopTime>().collect();

        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.table, "stop_times.txt");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn required_columns_are_checked() {
        let csv = "stop_name,parent_station\nFoo,\n";
        let mut decoder = RowDecoder::new("stops.txt", csv.as_bytes()).unwrap();

        let err = decoder.require_columns(&["stop_id"]).unwrap_err();
        assert!(matches!(err, FeedError::Malformed { file: "stops.txt", .. }));
        assert!(err.to_string().contains("stop_id"));
    }

    #[test]
    fn empty_optional_fields_are_none() {
        let csv = "trip_id,stop_id,arrival_time,departure_time,stop_sequence\n\
                   T1,S1,,08:05:00,3\n";
        let decoder = RowDecoder::new("stop_times.txt", csv.as_bytes()).unwrap();
        let (rows, _) = decoder.decode_all::<StopTime>();

        assert_eq!(rows[0].arrival_time, None);
        assert!(rows[0].departure_time.is_some());
    }
}
