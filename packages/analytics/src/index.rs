//! Geo-time index: full outer join of the datasets on (geography, date).
//!
//! Rows of one dataset that share a (geography, date) are summed, and a
//! side with no matching row contributes zero. The metric is cumulative,
//! so a day with no enrollment activity is a true zero rather than a
//! missing value.

use std::collections::{BTreeMap, BTreeSet};

use bli_analytics_models::{DateRange, UnifiedRow};
use bli_dataset_models::{DatasetKind, DistrictKey, GeoKey, RawRecord, canonical_name};
use chrono::NaiveDate;

use crate::AnalyticsError;

/// Min/max date of a record set.
fn record_range(records: &[RawRecord]) -> Option<DateRange> {
    let start = records.iter().map(|r| r.date).min()?;
    let end = records.iter().map(|r| r.date).max()?;
    Some(DateRange { start, end })
}

/// Fails when `kind`'s records share no day with `other`.
fn ensure_overlap(
    kind: DatasetKind,
    records: &[RawRecord],
    other: DateRange,
) -> Result<DateRange, AnalyticsError> {
    let range = record_range(records).ok_or(AnalyticsError::EmptyDataset { kind })?;
    if !range.overlaps(&other) {
        return Err(AnalyticsError::DisjointDates { kind, range, other });
    }
    Ok(range)
}

/// The joined (geography, date) row set.
///
/// Rows are held sorted by geography then date, at most one per pair.
#[derive(Debug, Clone)]
pub struct UnifiedIndex {
    rows: Vec<UnifiedRow>,
    has_demographic: bool,
}

impl UnifiedIndex {
    /// Joins the datasets.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::EmptyDataset`] if a supplied dataset has no rows.
    /// * [`AnalyticsError::DisjointDates`] if the biometric range shares no
    ///   day with the enrollment range, or the demographic range shares no
    ///   day with the other two combined.
    pub fn build(
        enrollment: &[RawRecord],
        biometric: &[RawRecord],
        demographic: Option<&[RawRecord]>,
    ) -> Result<Self, AnalyticsError> {
        let enrollment_range = record_range(enrollment).ok_or(AnalyticsError::EmptyDataset {
            kind: DatasetKind::Enrollment,
        })?;
        let biometric_range = ensure_overlap(DatasetKind::Biometric, biometric, enrollment_range)?;
        if let Some(demographic) = demographic {
            ensure_overlap(
                DatasetKind::Demographic,
                demographic,
                enrollment_range.union(&biometric_range),
            )?;
        }

        let has_demographic = demographic.is_some();
        let mut joined: BTreeMap<(GeoKey, NaiveDate), UnifiedRow> = BTreeMap::new();

        let sources = [Some(enrollment), Some(biometric), demographic];
        for record in sources.into_iter().flatten().flatten() {
            let row = joined
                .entry((record.geo.clone(), record.date))
                .or_insert_with(|| UnifiedRow {
                    geo: record.geo.clone(),
                    date: record.date,
                    enrollment: 0,
                    updates: 0,
                    demographic: has_demographic.then_some(0),
                });
            match record.kind {
                DatasetKind::Enrollment => {
                    row.enrollment = row.enrollment.saturating_add(record.count_5_17);
                }
                DatasetKind::Biometric => {
                    row.updates = row.updates.saturating_add(record.count_5_17);
                }
                DatasetKind::Demographic => {
                    row.demographic =
                        Some(row.demographic.unwrap_or(0).saturating_add(record.count_5_17));
                }
            }
        }

        let rows: Vec<UnifiedRow> = joined.into_values().collect();
        log::info!(
            "Joined {} enrollment, {} biometric, {} demographic records into {} unified rows",
            enrollment.len(),
            biometric.len(),
            demographic.map_or(0, <[RawRecord]>::len),
            rows.len()
        );

        Ok(Self {
            rows,
            has_demographic,
        })
    }

    /// All unified rows, sorted by geography then date.
    #[must_use]
    pub fn rows(&self) -> &[UnifiedRow] {
        &self.rows
    }

    /// Whether a demographic dataset took part in the join.
    #[must_use]
    pub const fn has_demographic(&self) -> bool {
        self.has_demographic
    }

    /// Min/max date over the unified rows.
    #[must_use]
    pub fn date_range(&self) -> Option<DateRange> {
        let start = self.rows.iter().map(|r| r.date).min()?;
        let end = self.rows.iter().map(|r| r.date).max()?;
        Some(DateRange { start, end })
    }

    /// Every distinct district in the index.
    #[must_use]
    pub fn districts(&self) -> BTreeSet<DistrictKey> {
        self.rows.iter().map(|r| r.geo.district_key()).collect()
    }

    /// Rows belonging to one district, across all its pincodes.
    pub fn district_rows<'a>(&'a self, key: &'a DistrictKey) -> impl Iterator<Item = &'a UnifiedRow> {
        self.rows
            .iter()
            .filter(move |r| r.geo.state == key.state && r.geo.district == key.district)
    }

    /// Resolves a district name, optionally qualified by state, to its key.
    ///
    /// Matching is case- and whitespace-insensitive.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::DistrictNotFound`] if nothing matches.
    /// * [`AnalyticsError::AmbiguousDistrict`] if no state was given and the
    ///   name exists in more than one state.
    pub fn resolve_district(
        &self,
        district: &str,
        state: Option<&str>,
    ) -> Result<DistrictKey, AnalyticsError> {
        let wanted_district = canonical_name(district);
        let wanted_state = state.map(canonical_name);

        let mut matches: Vec<DistrictKey> = self
            .districts()
            .into_iter()
            .filter(|k| k.district == wanted_district)
            .filter(|k| wanted_state.as_ref().is_none_or(|s| &k.state == s))
            .collect();

        match matches.len() {
            0 => Err(AnalyticsError::DistrictNotFound {
                district: district.trim().to_string(),
                state: state.map(|s| s.trim().to_string()),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(AnalyticsError::AmbiguousDistrict {
                district: wanted_district,
                states: matches.into_iter().map(|k| k.state).collect(),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn rec(kind: DatasetKind, date: &str, state: &str, district: &str, pin: &str, n: u64) -> RawRecord {
        RawRecord {
            kind,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            geo: GeoKey::new(state, district, pin),
            count_5_17: n,
        }
    }

    #[test]
    fn full_outer_join_zero_fills_missing_sides() {
        let enr = vec![
            rec(DatasetKind::Enrollment, "2025-03-01", "Goa", "North Goa", "403001", 10),
            rec(DatasetKind::Enrollment, "2025-03-02", "Goa", "North Goa", "403001", 5),
        ];
        let bio = vec![
            rec(DatasetKind::Biometric, "2025-03-02", "Goa", "North Goa", "403001", 3),
            rec(DatasetKind::Biometric, "2025-03-03", "Goa", "North Goa", "403001", 2),
        ];
        let index = UnifiedIndex::build(&enr, &bio, None).unwrap();
        let rows = index.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].enrollment, rows[0].updates), (10, 0));
        assert_eq!((rows[1].enrollment, rows[1].updates), (5, 3));
        assert_eq!((rows[2].enrollment, rows[2].updates), (0, 2));
        assert!(rows.iter().all(|r| r.demographic.is_none()));
    }

    #[test]
    fn duplicate_rows_with_huge_counts_saturate() {
        let enr = vec![
            rec(DatasetKind::Enrollment, "2025-03-01", "Goa", "North Goa", "403001", u64::MAX),
            rec(DatasetKind::Enrollment, "2025-03-01", "Goa", "North Goa", "403001", 1),
        ];
        let bio = vec![rec(DatasetKind::Biometric, "2025-03-01", "Goa", "North Goa", "403001", 1)];
        let index = UnifiedIndex::build(&enr, &bio, None).unwrap();
        assert_eq!(index.rows()[0].enrollment, u64::MAX);
    }

    #[test]
    fn case_variants_collapse_into_one_row() {
        let enr = vec![rec(DatasetKind::Enrollment, "2025-03-01", "Maharashtra", "Pune", "411001", 4)];
        let bio = vec![
            rec(DatasetKind::Biometric, "2025-03-01", "Maharashtra", "Pune", "411001", 1),
            rec(DatasetKind::Biometric, "2025-03-01", "MAHARASHTRA", "PUNE", "411001", 2),
        ];
        let index = UnifiedIndex::build(&enr, &bio, None).unwrap();
        assert_eq!(index.rows().len(), 1);
        assert_eq!(index.rows()[0].updates, 3);
    }

    #[test]
    fn demographic_zero_fills_when_present() {
        let enr = vec![
            rec(DatasetKind::Enrollment, "2025-03-01", "Goa", "North Goa", "403001", 1),
            rec(DatasetKind::Enrollment, "2025-03-01", "Goa", "South Goa", "403601", 1),
        ];
        let bio = vec![rec(DatasetKind::Biometric, "2025-03-01", "Goa", "North Goa", "403001", 1)];
        let demo = vec![rec(DatasetKind::Demographic, "2025-03-01", "Goa", "North Goa", "403001", 7)];
        let index = UnifiedIndex::build(&enr, &bio, Some(&demo)).unwrap();
        assert!(index.has_demographic());
        let demos: Vec<_> = index.rows().iter().map(|r| r.demographic).collect();
        assert_eq!(demos, vec![Some(7), Some(0)]);
    }

    #[test]
    fn disjoint_biometric_range_is_a_join_error() {
        let enr = vec![rec(DatasetKind::Enrollment, "2024-01-01", "Goa", "North Goa", "403001", 1)];
        let bio = vec![rec(DatasetKind::Biometric, "2025-01-01", "Goa", "North Goa", "403001", 1)];
        let err = UnifiedIndex::build(&enr, &bio, None).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::DisjointDates { kind: DatasetKind::Biometric, .. }
        ));
    }

    #[test]
    fn disjoint_demographic_range_is_a_join_error() {
        let enr = vec![rec(DatasetKind::Enrollment, "2025-01-01", "Goa", "North Goa", "403001", 1)];
        let bio = vec![rec(DatasetKind::Biometric, "2025-01-01", "Goa", "North Goa", "403001", 1)];
        let demo = vec![rec(DatasetKind::Demographic, "2023-06-01", "Goa", "North Goa", "403001", 1)];
        let err = UnifiedIndex::build(&enr, &bio, Some(&demo)).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::DisjointDates { kind: DatasetKind::Demographic, .. }
        ));
    }

    #[test]
    fn empty_enrollment_is_rejected() {
        let bio = vec![rec(DatasetKind::Biometric, "2025-01-05", "Goa", "North Goa", "403001", 1)];
        let err = UnifiedIndex::build(&[], &bio, None).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::EmptyDataset { kind: DatasetKind::Enrollment }
        ));
    }

    #[test]
    fn resolves_districts_by_name_and_state() {
        let enr = vec![
            rec(DatasetKind::Enrollment, "2025-01-01", "Maharashtra", "Aurangabad", "431001", 1),
            rec(DatasetKind::Enrollment, "2025-01-01", "Bihar", "Aurangabad", "824101", 1),
            rec(DatasetKind::Enrollment, "2025-01-01", "Maharashtra", "Pune", "411001", 1),
        ];
        let bio = vec![rec(DatasetKind::Biometric, "2025-01-01", "Maharashtra", "Pune", "411001", 1)];
        let index = UnifiedIndex::build(&enr, &bio, None).unwrap();

        assert_eq!(
            index.resolve_district("PUNE", None).unwrap(),
            DistrictKey::new("Maharashtra", "Pune")
        );
        assert_eq!(
            index.resolve_district("aurangabad", Some("bihar")).unwrap(),
            DistrictKey::new("Bihar", "Aurangabad")
        );
        match index.resolve_district("Aurangabad", None).unwrap_err() {
            AnalyticsError::AmbiguousDistrict { states, .. } => {
                assert_eq!(states, vec!["Bihar".to_string(), "Maharashtra".to_string()]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert!(matches!(
            index.resolve_district("Atlantis", None).unwrap_err(),
            AnalyticsError::DistrictNotFound { .. }
        ));
    }
}
