//! Gap-widening curves and monthly seasonality.

use std::collections::BTreeMap;

use bli_analytics_models::{GapPoint, GapSeries, MonthBucket, SeasonalityProfile, YearMonthPoint};
use bli_dataset_models::{DatasetKind, DistrictKey, RawRecord};
use chrono::{Datelike as _, Month, NaiveDate};

use crate::{AnalyticsError, bli::child_update_gap, index::UnifiedIndex};

/// Replays a district's rows in date order into running sums.
///
/// Rows of every pincode in the district are summed per date first, so
/// the curve has one point per date with activity.
///
/// # Errors
///
/// * [`AnalyticsError::DistrictNotFound`] if the district has no rows.
pub fn gap_series(index: &UnifiedIndex, key: &DistrictKey) -> Result<GapSeries, AnalyticsError> {
    let mut per_date: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for row in index.district_rows(key) {
        let entry = per_date.entry(row.date).or_default();
        entry.0 = entry.0.saturating_add(row.enrollment);
        entry.1 = entry.1.saturating_add(row.updates);
    }

    if per_date.is_empty() {
        return Err(AnalyticsError::DistrictNotFound {
            district: key.district.clone(),
            state: Some(key.state.clone()),
        });
    }

    let mut enrolled = 0u64;
    let mut updated = 0u64;
    let points = per_date
        .into_iter()
        .map(|(date, (enrollment, updates))| {
            enrolled = enrolled.saturating_add(enrollment);
            updated = updated.saturating_add(updates);
            GapPoint {
                date,
                cumulative_enrollments: enrolled,
                cumulative_updates: updated,
                gap: child_update_gap(enrolled, updated),
            }
        })
        .collect();

    Ok(GapSeries {
        state: key.state.clone(),
        district: key.district.clone(),
        points,
    })
}

fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or_else(String::new, |m| m.name().to_string())
}

/// Index of the first maximum (or minimum) bucket.
fn extreme(months: &[MonthBucket], want_max: bool) -> u32 {
    let mut best = &months[0];
    for bucket in &months[1..] {
        let better = if want_max {
            bucket.updates > best.updates
        } else {
            bucket.updates < best.updates
        };
        if better {
            best = bucket;
        }
    }
    best.month
}

/// Buckets biometric updates by calendar month, all years combined.
///
/// Enrollment records, when given, feed the per-(year, month) update rate.
///
/// # Errors
///
/// * [`AnalyticsError::EmptyDataset`] if there are no biometric records.
pub fn seasonality(
    biometric: &[RawRecord],
    enrollment: &[RawRecord],
) -> Result<SeasonalityProfile, AnalyticsError> {
    if biometric.is_empty() {
        return Err(AnalyticsError::EmptyDataset {
            kind: DatasetKind::Biometric,
        });
    }

    let mut monthly = [0u64; 12];
    let mut by_year_month: BTreeMap<(i32, u32), (u64, u64)> = BTreeMap::new();

    for record in biometric {
        let month = &mut monthly[record.date.month0() as usize];
        *month = month.saturating_add(record.count_5_17);
        let entry = by_year_month
            .entry((record.date.year(), record.date.month()))
            .or_default();
        entry.0 = entry.0.saturating_add(record.count_5_17);
    }
    for record in enrollment {
        let entry = by_year_month
            .entry((record.date.year(), record.date.month()))
            .or_default();
        entry.1 = entry.1.saturating_add(record.count_5_17);
    }

    let months: Vec<MonthBucket> = (1..=12u32)
        .zip(monthly)
        .map(|(month, updates)| MonthBucket {
            month,
            month_name: month_name(month),
            updates,
        })
        .collect();

    let peak_month = extreme(&months, true);
    let low_month = extreme(&months, false);

    #[allow(clippy::cast_precision_loss)]
    let by_year_month = by_year_month
        .into_iter()
        .map(|((year, month), (updates, enrollments))| YearMonthPoint {
            year,
            month,
            updates,
            enrollments,
            update_rate: if enrollments == 0 {
                0.0
            } else {
                updates as f64 / enrollments as f64
            },
        })
        .collect();

    log::debug!("Seasonality peak {peak_month}, low {low_month}");

    Ok(SeasonalityProfile {
        months,
        peak_month,
        peak_month_name: month_name(peak_month),
        low_month,
        low_month_name: month_name(low_month),
        by_year_month,
    })
}
