//! BLI scoring, risk classification, and ranking.

use std::cmp::Ordering;

use bli_analytics_models::{
    AnalysisResult, DistrictAggregate, RiskBucket, RiskLevel, StateAggregate,
};
use bli_dataset_models::DatasetKind;
use strum::IntoEnumIterator as _;

use crate::{
    AnalyticsError,
    aggregate::{Totals, aggregate_parallel},
    index::UnifiedIndex,
};

/// Enrollments not yet matched by a biometric update, floored at zero.
#[must_use]
pub const fn child_update_gap(enrollments: u64, updates: u64) -> u64 {
    enrollments.saturating_sub(updates)
}

/// Share of enrolled children still pending an update.
///
/// Always in `[0, 1]`; zero when there were no enrollments.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bli_score(enrollments: u64, updates: u64) -> f64 {
    if enrollments == 0 {
        return 0.0;
    }
    child_update_gap(enrollments, updates) as f64 / enrollments as f64
}

/// Ranking order: BLI descending, then gap descending, then name ascending.
fn rank(a_bli: f64, a_gap: u64, b_bli: f64, b_gap: u64) -> Ordering {
    b_bli.total_cmp(&a_bli).then_with(|| b_gap.cmp(&a_gap))
}

fn district_aggregate(state: &str, district: &str, totals: Totals) -> DistrictAggregate {
    let bli = bli_score(totals.enrollment, totals.updates);
    let risk_level = RiskLevel::from_score(bli);
    DistrictAggregate {
        state: state.to_string(),
        district: district.to_string(),
        total_enrollments: totals.enrollment,
        total_updates: totals.updates,
        child_update_gap: child_update_gap(totals.enrollment, totals.updates),
        demographic_total: totals.demographic,
        bli_score: bli,
        risk_level,
        color_code: risk_level.color_code().to_string(),
    }
}

fn state_aggregate(state: &str, district_count: u64, totals: Totals) -> StateAggregate {
    let bli = bli_score(totals.enrollment, totals.updates);
    let risk_level = RiskLevel::from_score(bli);
    StateAggregate {
        state: state.to_string(),
        district_count,
        total_enrollments: totals.enrollment,
        total_updates: totals.updates,
        child_update_gap: child_update_gap(totals.enrollment, totals.updates),
        demographic_total: totals.demographic,
        bli_score: bli,
        risk_level,
        color_code: risk_level.color_code().to_string(),
    }
}

/// Sorts districts into their deterministic ranking.
pub fn rank_districts(districts: &mut [DistrictAggregate]) {
    districts.sort_by(|a, b| {
        rank(a.bli_score, a.child_update_gap, b.bli_score, b.child_update_gap)
            .then_with(|| a.district.cmp(&b.district))
            .then_with(|| a.state.cmp(&b.state))
    });
}

/// Sorts states into their deterministic ranking.
pub fn rank_states(states: &mut [StateAggregate]) {
    states.sort_by(|a, b| {
        rank(a.bli_score, a.child_update_gap, b.bli_score, b.child_update_gap)
            .then_with(|| a.state.cmp(&b.state))
    });
}

/// Number of districts at each level, `Low` first, zero counts included.
#[must_use]
pub fn risk_distribution(districts: &[DistrictAggregate]) -> Vec<RiskBucket> {
    RiskLevel::iter()
        .map(|level| RiskBucket {
            risk_level: level,
            count: districts.iter().filter(|d| d.risk_level == level).count() as u64,
            color_code: level.color_code().to_string(),
        })
        .collect()
}

/// Output of one analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The snapshot handed to callers.
    pub result: AnalysisResult,
    /// Every district in ranking order (the snapshot keeps only the top N).
    pub districts: Vec<DistrictAggregate>,
}

/// Aggregates, scores, and ranks the index.
///
/// # Errors
///
/// * [`AnalyticsError::EmptyDataset`] if the index holds no rows.
pub fn analyze(
    index: &UnifiedIndex,
    top_n: usize,
    chunk_size: usize,
) -> Result<Analysis, AnalyticsError> {
    let partial = aggregate_parallel(index.rows(), chunk_size);
    let date_range = partial
        .date_range
        .ok_or(AnalyticsError::EmptyDataset {
            kind: DatasetKind::Enrollment,
        })?;

    let mut districts: Vec<DistrictAggregate> = partial
        .districts
        .iter()
        .map(|(key, totals)| district_aggregate(&key.state, &key.district, *totals))
        .collect();
    rank_districts(&mut districts);

    let mut state_summary: Vec<StateAggregate> = partial
        .states()
        .iter()
        .map(|(state, (count, totals))| state_aggregate(state, *count, *totals))
        .collect();
    rank_states(&mut state_summary);

    let grand = partial.grand_totals();
    let overall_bli = bli_score(grand.enrollment, grand.updates);
    let overall_risk_level = RiskLevel::from_score(overall_bli);

    let result = AnalysisResult {
        total_records: partial.rows,
        date_range,
        overall_bli,
        overall_risk_level,
        total_enrollments: grand.enrollment,
        total_updates: grand.updates,
        total_gap: child_update_gap(grand.enrollment, grand.updates),
        demographic_total: grand.demographic,
        district_count: districts.len() as u64,
        top_problem_districts: districts.iter().take(top_n).cloned().collect(),
        state_summary,
        risk_distribution: risk_distribution(&districts),
    };

    log::info!(
        "Analysed {} rows across {} districts: overall BLI {:.4} ({})",
        result.total_records,
        result.district_count,
        result.overall_bli,
        result.overall_risk_level
    );

    Ok(Analysis { result, districts })
}
