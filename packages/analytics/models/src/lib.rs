#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the analytics engine.
//!
//! Covers the unified (geography, date) rows, district and state
//! aggregates with their Biometric Lag Index (BLI) classification, the
//! top-level [`AnalysisResult`] snapshot, and the trend outputs
//! ([`GapSeries`], [`SeasonalityProfile`]).

use bli_dataset_models::GeoKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Ordinal classification of a BLI score.
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
#[strum(ascii_case_insensitive)]
pub enum RiskLevel {
    /// BLI below 0.1.
    Low,
    /// BLI in [0.1, 0.3).
    Medium,
    /// BLI in [0.3, 0.5).
    High,
    /// BLI of 0.5 or more.
    Critical,
}

impl RiskLevel {
    /// Lower bounds of each level above [`RiskLevel::Low`], in ladder order.
    pub const THRESHOLDS: [(f64, Self); 3] =
        [(0.5, Self::Critical), (0.3, Self::High), (0.1, Self::Medium)];

    /// Classifies a score against the fixed threshold ladder.
    ///
    /// Each threshold is an inclusive lower bound, so `0.1` is `Medium`,
    /// `0.3` is `High`, and `0.5` is `Critical`.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(bound, _)| score >= *bound)
            .map_or(Self::Low, |(_, level)| *level)
    }

    /// Hex colour used by every presentation surface for this level.
    #[must_use]
    pub const fn color_code(self) -> &'static str {
        match self {
            Self::Low => "#22c55e",
            Self::Medium => "#eab308",
            Self::High => "#f97316",
            Self::Critical => "#ef4444",
        }
    }

    /// Plain colour name for this level.
    #[must_use]
    pub const fn color_name(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "yellow",
            Self::High => "orange",
            Self::Critical => "red",
        }
    }

    /// Short guidance attached to this level.
    #[must_use]
    pub const fn guidance(self) -> &'static str {
        match self {
            Self::Low => "acceptable levels",
            Self::Medium => "needs monitoring",
            Self::High => "needs attention",
            Self::Critical => "immediate intervention required",
        }
    }
}

/// One (geography, date) with the counts of every dataset, 5-17 band.
///
/// Counts missing from a source dataset are zero; `demographic` is `None`
/// only when no demographic dataset was ingested at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRow {
    /// Reporting unit.
    pub geo: GeoKey,
    /// Reporting date.
    pub date: NaiveDate,
    /// Enrollments on this date.
    pub enrollment: u64,
    /// Biometric updates on this date.
    pub updates: u64,
    /// Demographic updates on this date.
    pub demographic: Option<u64>,
}

/// Cumulative totals and BLI for one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictAggregate {
    /// Canonical state name.
    pub state: String,
    /// Canonical district name.
    pub district: String,
    /// Enrollments over the whole data window.
    pub total_enrollments: u64,
    /// Biometric updates over the whole data window.
    pub total_updates: u64,
    /// `max(0, total_enrollments - total_updates)`.
    pub child_update_gap: u64,
    /// Demographic updates, when that dataset was ingested.
    pub demographic_total: Option<u64>,
    /// Biometric Lag Index in `[0, 1]`.
    pub bli_score: f64,
    /// Classification of `bli_score`.
    pub risk_level: RiskLevel,
    /// Colour tied to `risk_level`.
    pub color_code: String,
}

/// Cumulative totals and BLI for one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAggregate {
    /// Canonical state name.
    pub state: String,
    /// Number of districts reporting in this state.
    pub district_count: u64,
    /// Enrollments over the whole data window.
    pub total_enrollments: u64,
    /// Biometric updates over the whole data window.
    pub total_updates: u64,
    /// `max(0, total_enrollments - total_updates)`.
    pub child_update_gap: u64,
    /// Demographic updates, when that dataset was ingested.
    pub demographic_total: Option<u64>,
    /// Biometric Lag Index in `[0, 1]`.
    pub bli_score: f64,
    /// Classification of `bli_score`.
    pub risk_level: RiskLevel,
    /// Colour tied to `risk_level`.
    pub color_code: String,
}

/// Inclusive span of dates observed across all inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest date.
    pub start: NaiveDate,
    /// Latest date.
    pub end: NaiveDate,
}

impl DateRange {
    /// Whether the two ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The smallest range covering both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Number of districts at one risk level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBucket {
    /// The level.
    pub risk_level: RiskLevel,
    /// Districts classified at this level.
    pub count: u64,
    /// Colour tied to the level.
    pub color_code: String,
}

/// Immutable snapshot produced by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Number of unified (geography, date) rows analysed.
    pub total_records: u64,
    /// Min/max date across all unified rows.
    pub date_range: DateRange,
    /// BLI of the grand totals.
    pub overall_bli: f64,
    /// Classification of `overall_bli`.
    pub overall_risk_level: RiskLevel,
    /// Grand total of enrollments.
    pub total_enrollments: u64,
    /// Grand total of biometric updates.
    pub total_updates: u64,
    /// `max(0, total_enrollments - total_updates)`.
    pub total_gap: u64,
    /// Grand total of demographic updates, when that dataset was ingested.
    pub demographic_total: Option<u64>,
    /// Number of distinct (state, district) pairs.
    pub district_count: u64,
    /// Highest-BLI districts, ranked.
    pub top_problem_districts: Vec<DistrictAggregate>,
    /// Every state, ranked.
    pub state_summary: Vec<StateAggregate>,
    /// District counts per risk level, `Low` first.
    pub risk_distribution: Vec<RiskBucket>,
}

impl AnalysisResult {
    /// Number of districts at the given level.
    #[must_use]
    pub fn districts_at(&self, level: RiskLevel) -> u64 {
        self.risk_distribution
            .iter()
            .find(|b| b.risk_level == level)
            .map_or(0, |b| b.count)
    }
}

/// One point on a gap-widening curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapPoint {
    /// Date of the point.
    pub date: NaiveDate,
    /// Enrollments up to and including `date`.
    pub cumulative_enrollments: u64,
    /// Biometric updates up to and including `date`.
    pub cumulative_updates: u64,
    /// `max(0, cumulative_enrollments - cumulative_updates)`.
    pub gap: u64,
}

/// Cumulative enrollment vs. update curve for one district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapSeries {
    /// Canonical state name.
    pub state: String,
    /// Canonical district name.
    pub district: String,
    /// Points in ascending date order.
    pub points: Vec<GapPoint>,
}

impl GapSeries {
    /// The last point of the curve, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&GapPoint> {
        self.points.last()
    }
}

/// Update volume for one calendar month, all years combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    /// Month number, 1-12.
    pub month: u32,
    /// English month name.
    pub month_name: String,
    /// Biometric updates recorded in this month.
    pub updates: u64,
}

/// Update and enrollment volume for one (year, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearMonthPoint {
    /// Calendar year.
    pub year: i32,
    /// Month number, 1-12.
    pub month: u32,
    /// Biometric updates.
    pub updates: u64,
    /// Enrollments.
    pub enrollments: u64,
    /// `updates / enrollments`, 0 when there were no enrollments.
    pub update_rate: f64,
}

/// Monthly pattern of biometric update activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalityProfile {
    /// Exactly twelve buckets, January first.
    pub months: Vec<MonthBucket>,
    /// Month with the most updates (earliest on ties).
    pub peak_month: u32,
    /// Name of `peak_month`.
    pub peak_month_name: String,
    /// Month with the fewest updates (earliest on ties).
    pub low_month: u32,
    /// Name of `low_month`.
    pub low_month_name: String,
    /// Per-(year, month) volumes in ascending order.
    pub by_year_month: Vec<YearMonthPoint>,
}
