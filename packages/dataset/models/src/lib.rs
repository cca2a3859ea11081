#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset kinds, raw record types, and geography keys.
//!
//! Every uploaded table is parsed into [`RawRecord`]s of exactly one
//! [`DatasetKind`]. Geography is identified by a [`GeoKey`] whose
//! components are held in a canonical form, so two rows that differ only
//! in case or whitespace always compare equal downstream.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Fixed width of an Indian postal index number.
pub const PINCODE_WIDTH: usize = 6;

/// The three administrative datasets the engine understands.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DatasetKind {
    /// New enrollments, 5-17 age band in `age_5_17`.
    Enrollment,
    /// Mandatory biometric updates, 5-17 age band in `bio_age_5_17`.
    Biometric,
    /// Demographic updates, 5-17 age band in `demo_age_5_17`. Optional.
    Demographic,
}

/// Columns shared by every dataset kind.
const KEY_COLUMNS: [&str; 4] = ["date", "state", "district", "pincode"];

impl DatasetKind {
    /// Every kind, in upload order.
    pub const ALL: &[Self] = &[Self::Enrollment, Self::Biometric, Self::Demographic];

    /// Name of the column holding the 5-17 age band count.
    #[must_use]
    pub const fn count_column(self) -> &'static str {
        match self {
            Self::Enrollment => "age_5_17",
            Self::Biometric => "bio_age_5_17",
            Self::Demographic => "demo_age_5_17",
        }
    }

    /// All columns a file of this kind must carry.
    #[must_use]
    pub const fn required_columns(self) -> [&'static str; 5] {
        [
            KEY_COLUMNS[0],
            KEY_COLUMNS[1],
            KEY_COLUMNS[2],
            KEY_COLUMNS[3],
            self.count_column(),
        ]
    }

    /// Whether analysis can run without this dataset.
    #[must_use]
    pub const fn is_mandatory(self) -> bool {
        !matches!(self, Self::Demographic)
    }

    /// Human-readable label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Enrollment => "Enrollment",
            Self::Biometric => "Biometric",
            Self::Demographic => "Demographic",
        }
    }
}

/// Canonicalizes a geographic name.
///
/// Whitespace is trimmed and collapsed, and every word is title-cased, so
/// `"  PUNE "`, `"pune"` and `"Pune"` all become `"Pune"`.
#[must_use]
pub fn canonical_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A reporting unit: (state, district, pincode) in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoKey {
    /// Canonical state name.
    pub state: String,
    /// Canonical district name.
    pub district: String,
    /// Zero-padded pincode text.
    pub pincode: String,
}

impl GeoKey {
    /// Builds a key, canonicalizing the state and district names.
    ///
    /// The pincode is taken as-is; validation and padding happen at the
    /// ingestion boundary.
    #[must_use]
    pub fn new(state: &str, district: &str, pincode: &str) -> Self {
        Self {
            state: canonical_name(state),
            district: canonical_name(district),
            pincode: pincode.trim().to_string(),
        }
    }

    /// The (state, district) part of this key.
    #[must_use]
    pub fn district_key(&self) -> DistrictKey {
        DistrictKey {
            state: self.state.clone(),
            district: self.district.clone(),
        }
    }
}

impl std::fmt::Display for GeoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {} ({})", self.district, self.state, self.pincode)
    }
}

/// Identity of a district. Districts are always keyed together with their
/// state, never by name alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictKey {
    /// Canonical state name.
    pub state: String,
    /// Canonical district name.
    pub district: String,
}

impl DistrictKey {
    /// Builds a key from raw names.
    #[must_use]
    pub fn new(state: &str, district: &str) -> Self {
        Self {
            state: canonical_name(state),
            district: canonical_name(district),
        }
    }
}

impl std::fmt::Display for DistrictKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.district, self.state)
    }
}

/// One validated row of an input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Dataset this row came from.
    pub kind: DatasetKind,
    /// Reporting date.
    pub date: NaiveDate,
    /// Reporting unit.
    pub geo: GeoKey,
    /// Count in the 5-17 age band.
    pub count_5_17: u64,
}

/// A defect found while validating an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRejection {
    /// 1-based data row number (header excluded). `None` for file-level
    /// defects such as a missing column.
    pub row_index: Option<u64>,
    /// Offending column, when one can be named.
    pub column: Option<String>,
    /// What was wrong.
    pub reason: String,
}

impl RowRejection {
    /// A defect tied to a specific row and column.
    #[must_use]
    pub fn at(row_index: u64, column: &str, reason: impl Into<String>) -> Self {
        Self {
            row_index: Some(row_index),
            column: Some(column.to_string()),
            reason: reason.into(),
        }
    }

    /// A defect affecting the whole file.
    #[must_use]
    pub fn file(column: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            row_index: None,
            column: column.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.row_index, &self.column) {
            (Some(row), Some(col)) => write!(f, "row {row}, column '{col}': {}", self.reason),
            (Some(row), None) => write!(f, "row {row}: {}", self.reason),
            (None, Some(col)) => write!(f, "column '{col}': {}", self.reason),
            (None, None) => f.write_str(&self.reason),
        }
    }
}

/// Outcome of ingesting one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Dataset the file was declared as.
    pub kind: DatasetKind,
    /// Rows that passed validation.
    pub accepted_rows: u64,
    /// Rows that were rejected (within the configured tolerance).
    pub rejected_rows: Vec<RowRejection>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn canonical_name_collapses_case_and_whitespace() {
        assert_eq!(canonical_name("  PUNE "), "Pune");
        assert_eq!(canonical_name("pune"), "Pune");
        assert_eq!(canonical_name("north   24 PARGANAS"), "North 24 Parganas");
        assert_eq!(canonical_name(""), "");
    }

    #[test]
    fn geo_keys_differing_only_in_case_are_equal() {
        let a = GeoKey::new("Maharashtra", "Pune", "411001");
        let b = GeoKey::new(" MAHARASHTRA", "PUNE ", " 411001");
        assert_eq!(a, b);
        assert_eq!(a.district_key(), DistrictKey::new("maharashtra", "pune"));
    }

    #[test]
    fn same_district_name_in_different_states_stays_distinct() {
        let a = DistrictKey::new("Maharashtra", "Aurangabad");
        let b = DistrictKey::new("Bihar", "Aurangabad");
        assert_ne!(a, b);
    }

    #[test]
    fn required_columns_end_with_count_column() {
        for kind in DatasetKind::iter() {
            let cols = kind.required_columns();
            assert_eq!(cols[4], kind.count_column());
            assert_eq!(&cols[..4], &KEY_COLUMNS);
        }
    }

    #[test]
    fn only_demographic_is_optional() {
        assert!(DatasetKind::Enrollment.is_mandatory());
        assert!(DatasetKind::Biometric.is_mandatory());
        assert!(!DatasetKind::Demographic.is_mandatory());
    }

    #[test]
    fn dataset_kind_parses_case_insensitively() {
        assert_eq!(
            DatasetKind::from_str("Biometric").unwrap(),
            DatasetKind::Biometric
        );
        assert_eq!(DatasetKind::Enrollment.to_string(), "enrollment");
        assert!(DatasetKind::from_str("census").is_err());
    }

    #[test]
    fn rejection_display_names_row_and_column() {
        let r = RowRejection::at(3, "date", "unparsable date '31-02-2024'");
        assert_eq!(
            r.to_string(),
            "row 3, column 'date': unparsable date '31-02-2024'"
        );
        let f = RowRejection::file(Some("age_5_17"), "missing required column");
        assert_eq!(f.to_string(), "column 'age_5_17': missing required column");
    }

    #[test]
    fn raw_record_serializes_pincode_as_text() {
        let rec = RawRecord {
            kind: DatasetKind::Enrollment,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            geo: GeoKey::new("Delhi", "New Delhi", "011001"),
            count_5_17: 4,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["geo"]["pincode"], "011001");
    }
}
