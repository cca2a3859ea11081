//! Cumulative district and state totals.
//!
//! Aggregation is a fold over unified rows into a [`PartialAggregate`].
//! Partials built from any split of the rows merge into the same result,
//! so large inputs are folded chunk-by-chunk on the rayon pool and the
//! partials reduced together.

use std::collections::BTreeMap;

use bli_analytics_models::{DateRange, UnifiedRow};
use bli_dataset_models::DistrictKey;
use rayon::prelude::*;

/// Cumulative counts for one unit (district, state, or the whole input).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Enrollments.
    pub enrollment: u64,
    /// Biometric updates.
    pub updates: u64,
    /// Demographic updates, `None` when that dataset is absent.
    pub demographic: Option<u64>,
}

impl Totals {
    fn add_row(&mut self, row: &UnifiedRow) {
        self.enrollment = self.enrollment.saturating_add(row.enrollment);
        self.updates = self.updates.saturating_add(row.updates);
        self.demographic = add_optional(self.demographic, row.demographic);
    }

    /// Combines two totals.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            enrollment: self.enrollment.saturating_add(other.enrollment),
            updates: self.updates.saturating_add(other.updates),
            demographic: add_optional(self.demographic, other.demographic),
        }
    }
}

fn add_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
    }
}

/// Totals for any subset of the unified rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialAggregate {
    /// Rows folded in.
    pub rows: u64,
    /// Date span of the rows folded in.
    pub date_range: Option<DateRange>,
    /// Per-district totals.
    pub districts: BTreeMap<DistrictKey, Totals>,
}

impl PartialAggregate {
    /// Folds one row in.
    pub fn add_row(&mut self, row: &UnifiedRow) {
        self.rows += 1;
        let day = DateRange {
            start: row.date,
            end: row.date,
        };
        self.date_range = Some(self.date_range.map_or(day, |r| r.union(&day)));
        self.districts
            .entry(row.geo.district_key())
            .or_default()
            .add_row(row);
    }

    /// Merges another partial into this one.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.rows += other.rows;
        self.date_range = match (self.date_range, other.date_range) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
        for (key, totals) in other.districts {
            let entry = self.districts.entry(key).or_default();
            *entry = entry.merge(totals);
        }
        self
    }

    /// Grand totals over every district.
    #[must_use]
    pub fn grand_totals(&self) -> Totals {
        self.districts
            .values()
            .fold(Totals::default(), |acc, t| acc.merge(*t))
    }

    /// Per-state totals with the number of districts in each state.
    #[must_use]
    pub fn states(&self) -> BTreeMap<String, (u64, Totals)> {
        let mut states: BTreeMap<String, (u64, Totals)> = BTreeMap::new();
        for (key, totals) in &self.districts {
            let entry = states.entry(key.state.clone()).or_default();
            entry.0 += 1;
            entry.1 = entry.1.merge(*totals);
        }
        states
    }
}

/// Sequential fold over `rows`.
#[must_use]
pub fn aggregate<'a>(rows: impl IntoIterator<Item = &'a UnifiedRow>) -> PartialAggregate {
    rows.into_iter()
        .fold(PartialAggregate::default(), |mut acc, row| {
            acc.add_row(row);
            acc
        })
}

/// Folds `rows` in chunks of `chunk_size` on the rayon pool.
///
/// Produces the same result as [`aggregate`] regardless of chunk size.
#[must_use]
pub fn aggregate_parallel(rows: &[UnifiedRow], chunk_size: usize) -> PartialAggregate {
    let chunk_size = chunk_size.max(1);
    log::debug!(
        "Aggregating {} rows in chunks of {chunk_size}",
        rows.len()
    );
    rows.par_chunks(chunk_size)
        .map(aggregate)
        .reduce(PartialAggregate::default, PartialAggregate::merge)
}

#[cfg(test)]
mod tests {
    use bli_dataset_models::{DatasetKind, GeoKey};
    use chrono::NaiveDate;

    use super::*;
    use crate::index::{UnifiedIndex, tests::rec};

    fn sample_index() -> UnifiedIndex {
        let mut enr = Vec::new();
        let mut bio = Vec::new();
        let places = [
            ("Maharashtra", "Pune", "411001"),
            ("Maharashtra", "Pune", "411002"),
            ("Maharashtra", "Nagpur", "440001"),
            ("Bihar", "Aurangabad", "824101"),
            ("Maharashtra", "Aurangabad", "431001"),
        ];
        for day in 1..=9u64 {
            let date = format!("2025-03-{day:02}");
            for (i, (state, district, pin)) in places.iter().enumerate() {
                let i = i as u64;
                enr.push(rec(DatasetKind::Enrollment, &date, state, district, pin, day * 10 + i));
                if day % 3 != 0 {
                    bio.push(rec(DatasetKind::Biometric, &date, state, district, pin, day * 4 + i));
                }
            }
        }
        UnifiedIndex::build(&enr, &bio, None).unwrap()
    }

    #[test]
    fn chunked_fold_matches_sequential_fold() {
        let index = sample_index();
        let expected = aggregate(index.rows());
        for chunk in [1, 2, 3, 7, 1000] {
            assert_eq!(aggregate_parallel(index.rows(), chunk), expected, "chunk {chunk}");
        }
    }

    #[test]
    fn fold_is_independent_of_row_order() {
        let index = sample_index();
        let mut reversed = index.rows().to_vec();
        reversed.reverse();
        assert_eq!(aggregate(&reversed), aggregate(index.rows()));
    }

    #[test]
    fn pincodes_roll_up_into_their_district() {
        let agg = aggregate(sample_index().rows());
        let pune = agg.districts[&DistrictKey::new("Maharashtra", "Pune")];
        // day * 10 summed over 1..=9 is 450, plus pincode offsets 0 and 1 per day.
        assert_eq!(pune.enrollment, 450 + 450 + 9);
        assert_eq!(agg.districts.len(), 4);
    }

    #[test]
    fn states_count_their_districts() {
        let agg = aggregate(sample_index().rows());
        let states = agg.states();
        assert_eq!(states["Maharashtra"].0, 3);
        assert_eq!(states["Bihar"].0, 1);
        let total = agg.grand_totals();
        let from_states = states
            .values()
            .fold(Totals::default(), |acc, (_, t)| acc.merge(*t));
        assert_eq!(total, from_states);
    }

    #[test]
    fn demographic_stays_absent_without_the_dataset() {
        let row = UnifiedRow {
            geo: GeoKey::new("Goa", "North Goa", "403001"),
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            enrollment: 3,
            updates: 1,
            demographic: None,
        };
        let agg = aggregate([&row]);
        assert_eq!(agg.grand_totals().demographic, None);

        let with_demo = UnifiedRow {
            demographic: Some(0),
            ..row
        };
        assert_eq!(aggregate([&with_demo]).grand_totals().demographic, Some(0));
    }

    #[test]
    fn empty_input_has_no_date_range() {
        let agg = aggregate_parallel(&[], 4);
        assert_eq!(agg.rows, 0);
        assert!(agg.date_range.is_none());
    }
}
