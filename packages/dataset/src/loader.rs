//! CSV loader for a single declared dataset kind.
//!
//! Reads an uploaded byte stream (optionally gzip-compressed), resolves
//! the required columns from the header row, and validates every data row
//! into a [`RawRecord`]. Row-level defects are accumulated rather than
//! aborting on the first one; the file fails as a whole only when the
//! number of rejected rows exceeds the configured tolerance.

use std::collections::BTreeMap;
use std::io::Read as _;

use bli_dataset_models::{DatasetKind, GeoKey, RawRecord, RowRejection};

use crate::DatasetError;
use crate::parsing::{parse_count, parse_date, parse_name, parse_pincode};
use crate::progress::{CancelToken, ProgressCallback};

/// First two bytes of every gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default number of rows parsed between cancellation checkpoints.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Knobs for a single load.
pub struct LoadOptions<'a> {
    /// Maximum number of rejected rows before the whole file fails.
    pub error_tolerance: usize,
    /// Rows parsed between cancellation checkpoints and progress updates.
    pub chunk_size: usize,
    /// Checked between chunks.
    pub cancel: &'a CancelToken,
    /// Receives one unit per parsed row.
    pub progress: &'a dyn ProgressCallback,
}

/// A successfully loaded dataset.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Declared kind of the file.
    pub kind: DatasetKind,
    /// Validated rows, in file order.
    pub records: Vec<RawRecord>,
    /// Defects in rows that were dropped (never more rows than the tolerance).
    pub rejected: Vec<RowRejection>,
}

/// Resolved positions of the required columns.
struct ColumnIndex {
    date: usize,
    state: usize,
    district: usize,
    pincode: usize,
    count: usize,
}

impl ColumnIndex {
    /// Matches trimmed, case-insensitive headers against the required
    /// columns, reporting every missing one.
    fn resolve(kind: DatasetKind, headers: &csv::StringRecord) -> Result<Self, Vec<RowRejection>> {
        let positions: BTreeMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();

        let required = kind.required_columns();
        let missing: Vec<RowRejection> = required
            .iter()
            .filter(|col| !positions.contains_key(**col))
            .map(|col| {
                RowRejection::file(
                    Some(*col),
                    format!(
                        "missing required column (found: {})",
                        headers.iter().map(str::trim).collect::<Vec<_>>().join(", ")
                    ),
                )
            })
            .collect();

        if !missing.is_empty() {
            return Err(missing);
        }

        let extra: Vec<&String> = positions
            .keys()
            .filter(|h| !required.contains(&h.as_str()))
            .collect();
        if !extra.is_empty() {
            log::debug!("[{kind}] ignoring extra columns: {extra:?}");
        }

        let at = |col: &str| positions.get(col).copied().unwrap_or_default();
        Ok(Self {
            date: at(required[0]),
            state: at(required[1]),
            district: at(required[2]),
            pincode: at(required[3]),
            count: at(required[4]),
        })
    }
}

/// Decompresses the payload when it carries the gzip magic number.
fn decode(kind: DatasetKind, bytes: &[u8]) -> Result<std::borrow::Cow<'_, [u8]>, DatasetError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(std::borrow::Cow::Borrowed(bytes));
    }

    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| DatasetError::Validation {
        kind,
        rejections: vec![RowRejection::file(None, format!("invalid gzip stream: {e}"))],
    })?;
    log::debug!(
        "[{kind}] decompressed {} bytes to {} bytes",
        bytes.len(),
        out.len()
    );
    Ok(std::borrow::Cow::Owned(out))
}

/// Reads one cell, recording a defect when the row is too short.
fn cell<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    row_index: u64,
    column: &str,
    defects: &mut Vec<RowRejection>,
) -> Option<&'r str> {
    let value = record.get(idx);
    if value.is_none() {
        defects.push(RowRejection::at(row_index, column, "missing value"));
    }
    value
}

/// Unwraps a field parse, recording the reason on failure.
fn check<T>(
    result: Result<T, String>,
    row_index: u64,
    column: &str,
    defects: &mut Vec<RowRejection>,
) -> Option<T> {
    result
        .map_err(|reason| defects.push(RowRejection::at(row_index, column, reason)))
        .ok()
}

/// Validates one data row, collecting every defect in it.
fn parse_row(
    kind: DatasetKind,
    row_index: u64,
    record: &csv::StringRecord,
    cols: &ColumnIndex,
) -> Result<RawRecord, Vec<RowRejection>> {
    let mut defects = Vec::new();
    let [date_col, state_col, district_col, pincode_col, count_col] = kind.required_columns();

    let date = cell(record, cols.date, row_index, date_col, &mut defects)
        .and_then(|v| check(parse_date(v), row_index, date_col, &mut defects));
    let state = cell(record, cols.state, row_index, state_col, &mut defects)
        .and_then(|v| check(parse_name(v, "state"), row_index, state_col, &mut defects));
    let district = cell(record, cols.district, row_index, district_col, &mut defects)
        .and_then(|v| check(parse_name(v, "district"), row_index, district_col, &mut defects));
    let pincode = cell(record, cols.pincode, row_index, pincode_col, &mut defects)
        .and_then(|v| check(parse_pincode(v), row_index, pincode_col, &mut defects));
    let count = cell(record, cols.count, row_index, count_col, &mut defects)
        .and_then(|v| check(parse_count(v), row_index, count_col, &mut defects));

    match (date, state, district, pincode, count) {
        (Some(date), Some(state), Some(district), Some(pincode), Some(count_5_17))
            if defects.is_empty() =>
        {
            Ok(RawRecord {
                kind,
                date,
                geo: GeoKey::new(&state, &district, &pincode),
                count_5_17,
            })
        }
        _ => Err(defects),
    }
}

/// Loads and validates one uploaded file.
///
/// # Errors
///
/// * [`DatasetError::Validation`] if the file cannot be read as CSV, lacks
///   a required column, has no data rows, or has more rejected rows than
///   `options.error_tolerance`. The error lists every defect found.
/// * [`DatasetError::Cancelled`] if `options.cancel` fires between chunks.
pub fn load(
    kind: DatasetKind,
    bytes: &[u8],
    options: &LoadOptions<'_>,
) -> Result<LoadedDataset, DatasetError> {
    let payload = decode(kind, bytes)?;
    let chunk_size = options.chunk_size.max(1);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(payload.as_ref());

    let headers = reader
        .headers()
        .map_err(|e| DatasetError::Validation {
            kind,
            rejections: vec![RowRejection::file(None, format!("unreadable header row: {e}"))],
        })?
        .clone();

    let cols = ColumnIndex::resolve(kind, &headers)
        .map_err(|rejections| DatasetError::Validation { kind, rejections })?;

    let line_count = payload.iter().filter(|b| **b == b'\n').count() as u64;
    options.progress.set_total(line_count.saturating_sub(1));
    options.progress.set_message(format!("Parsing {} file", kind.label()));

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    let mut rejected_rows: usize = 0;
    let mut row_index: u64 = 0;
    let mut since_checkpoint: usize = 0;

    for result in reader.records() {
        row_index += 1;

        let outcome = match result {
            Ok(record) => parse_row(kind, row_index, &record, &cols),
            Err(e) => Err(vec![RowRejection {
                row_index: Some(row_index),
                column: None,
                reason: format!("unreadable row: {e}"),
            }]),
        };

        match outcome {
            Ok(record) => records.push(record),
            Err(defects) => {
                rejected_rows += 1;
                rejected.extend(defects);
            }
        }

        since_checkpoint += 1;
        if since_checkpoint == chunk_size {
            options.progress.inc(since_checkpoint as u64);
            since_checkpoint = 0;
            if options.cancel.is_cancelled() {
                log::info!("[{kind}] parse cancelled after {row_index} rows");
                return Err(DatasetError::Cancelled {
                    kind,
                    rows_read: row_index,
                });
            }
        }
    }
    options.progress.inc(since_checkpoint as u64);

    if options.cancel.is_cancelled() {
        log::info!("[{kind}] parse cancelled after {row_index} rows");
        return Err(DatasetError::Cancelled {
            kind,
            rows_read: row_index,
        });
    }

    if row_index == 0 {
        return Err(DatasetError::Validation {
            kind,
            rejections: vec![RowRejection::file(None, format!("{} file is empty", kind.label()))],
        });
    }

    if rejected_rows > options.error_tolerance {
        log::warn!(
            "[{kind}] {rejected_rows} of {row_index} rows rejected (tolerance {})",
            options.error_tolerance
        );
        return Err(DatasetError::Validation {
            kind,
            rejections: rejected,
        });
    }

    log::info!(
        "[{kind}] accepted {} rows, rejected {rejected_rows}",
        records.len()
    );
    options.progress.finish(format!(
        "{} file: {} rows accepted",
        kind.label(),
        records.len()
    ));

    Ok(LoadedDataset {
        kind,
        records,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use chrono::NaiveDate;

    use super::*;
    use crate::progress::NullProgress;

    fn load_str(kind: DatasetKind, csv: &str, tolerance: usize) -> Result<LoadedDataset, DatasetError> {
        let cancel = CancelToken::new();
        let options = LoadOptions {
            error_tolerance: tolerance,
            chunk_size: 2,
            cancel: &cancel,
            progress: &NullProgress,
        };
        load(kind, csv.as_bytes(), &options)
    }

    fn rejections(err: DatasetError) -> Vec<RowRejection> {
        match err {
            DatasetError::Validation { rejections, .. } => rejections,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn loads_enrollment_rows() {
        let csv = "date,state,district,pincode,age_0_5,age_5_17\n\
                   01-03-2025,Maharashtra,Pune,411001,3,10\n\
                   02-03-2025,Maharashtra,Pune,011001,1,5\n";
        let loaded = load_str(DatasetKind::Enrollment, csv, 0).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert!(loaded.rejected.is_empty());
        let first = &loaded.records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(first.count_5_17, 10);
        assert_eq!(loaded.records[1].geo.pincode, "011001");
    }

    #[test]
    fn headers_are_trimmed_and_case_insensitive() {
        let csv = " Date , STATE,district , Pincode,BIO_AGE_5_17\n01-03-2025,Goa,North Goa,403001,4\n";
        let loaded = load_str(DatasetKind::Biometric, csv, 0).unwrap();
        assert_eq!(loaded.records[0].count_5_17, 4);
    }

    #[test]
    fn reports_every_missing_column() {
        let csv = "date,state,district\n01-03-2025,Goa,North Goa\n";
        let errs = rejections(load_str(DatasetKind::Enrollment, csv, 0).unwrap_err());
        let missing: Vec<_> = errs.iter().filter_map(|r| r.column.as_deref()).collect();
        assert_eq!(missing, vec!["pincode", "age_5_17"]);
        assert!(errs.iter().all(|r| r.row_index.is_none()));
    }

    #[test]
    fn accumulates_all_row_errors_before_failing() {
        let csv = "date,state,district,pincode,age_5_17\n\
                   31-02-2025,Goa,North Goa,403001,4\n\
                   01-03-2025,Goa,North Goa,403001,4\n\
                   02-03-2025,Goa,,4030A1,-1\n";
        let errs = rejections(load_str(DatasetKind::Enrollment, csv, 0).unwrap_err());
        assert_eq!(errs.len(), 4);
        assert_eq!(errs[0].row_index, Some(1));
        assert_eq!(errs[0].column.as_deref(), Some("date"));
        let row3: Vec<_> = errs
            .iter()
            .filter(|r| r.row_index == Some(3))
            .filter_map(|r| r.column.as_deref())
            .collect();
        assert_eq!(row3, vec!["district", "pincode", "age_5_17"]);
    }

    #[test]
    fn tolerance_admits_bad_rows_but_reports_them() {
        let csv = "date,state,district,pincode,age_5_17\n\
                   not-a-date,Goa,North Goa,403001,4\n\
                   01-03-2025,Goa,North Goa,403001,4\n";
        let loaded = load_str(DatasetKind::Enrollment, csv, 1).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].row_index, Some(1));
    }

    #[test]
    fn short_rows_are_rejected_not_panicked() {
        let csv = "date,state,district,pincode,age_5_17\n01-03-2025,Goa\n";
        let errs = rejections(load_str(DatasetKind::Enrollment, csv, 0).unwrap_err());
        assert!(errs.iter().all(|r| r.reason == "missing value"));
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn header_only_file_is_rejected() {
        let csv = "date,state,district,pincode,age_5_17\n";
        let errs = rejections(load_str(DatasetKind::Enrollment, csv, 0).unwrap_err());
        assert!(errs[0].reason.contains("empty"));
    }

    #[test]
    fn reads_gzip_payloads() {
        let csv = "date,state,district,pincode,demo_age_5_17\n01-03-2025,Goa,North Goa,403001,9\n";
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(csv.as_bytes()).unwrap();
        let bytes = encoder.finish().unwrap();

        let cancel = CancelToken::new();
        let options = LoadOptions {
            error_tolerance: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: &cancel,
            progress: &NullProgress,
        };
        let loaded = load(DatasetKind::Demographic, &bytes, &options).unwrap();
        assert_eq!(loaded.records[0].count_5_17, 9);
    }

    #[test]
    fn cancellation_is_checked_between_chunks() {
        let csv = "date,state,district,pincode,age_5_17\n\
                   01-03-2025,Goa,North Goa,403001,4\n\
                   02-03-2025,Goa,North Goa,403001,4\n\
                   03-03-2025,Goa,North Goa,403001,4\n";
        let cancel = CancelToken::new();
        cancel.cancel();
        let options = LoadOptions {
            error_tolerance: 0,
            chunk_size: 2,
            cancel: &cancel,
            progress: &NullProgress,
        };
        let err = load(DatasetKind::Enrollment, csv.as_bytes(), &options).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Cancelled { rows_read: 2, .. }
        ));
    }

    #[test]
    fn cancellation_is_checked_after_a_partial_chunk() {
        let csv = "date,state,district,pincode,age_5_17\n\
                   01-03-2025,Goa,North Goa,403001,4\n";
        let cancel = CancelToken::new();
        cancel.cancel();
        let options = LoadOptions {
            error_tolerance: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: &cancel,
            progress: &NullProgress,
        };
        let err = load(DatasetKind::Enrollment, csv.as_bytes(), &options).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Cancelled { rows_read: 1, .. }
        ));
    }

    #[test]
    fn oversized_count_is_a_row_rejection() {
        let csv = "date,state,district,pincode,age_5_17\n\
                   01-03-2025,Goa,North Goa,403001,18446744073709551615\n\
                   01-03-2025,Goa,North Goa,403001,1\n";
        let defects = rejections(load_str(DatasetKind::Enrollment, csv, 0).unwrap_err());
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].row_index, Some(1));
        assert_eq!(defects[0].column.as_deref(), Some("age_5_17"));
        assert!(defects[0].reason.contains("exceeds"));
    }
}
