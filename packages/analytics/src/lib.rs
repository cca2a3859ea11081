#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics engine for the Biometric Lag Index.
//!
//! Data flows [`index`] → [`aggregate`] → {[`bli`], [`trend`]}:
//! validated records are joined on (geography, date), folded into
//! cumulative district and state totals, scored and ranked, and replayed
//! into gap-widening curves and a monthly seasonality profile.

pub mod aggregate;
pub mod bli;
pub mod index;
pub mod trend;

use bli_analytics_models::DateRange;
use bli_dataset_models::DatasetKind;
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A dataset covers no day in common with the others.
    #[error("{} data ({range}) does not overlap the other datasets ({other}); was the wrong file uploaded?", .kind.label())]
    DisjointDates {
        /// Dataset whose range is disjoint.
        kind: DatasetKind,
        /// That dataset's date range.
        range: DateRange,
        /// Combined range of the datasets it was compared against.
        other: DateRange,
    },

    /// A dataset has no rows to join.
    #[error("{} dataset has no rows to join", .kind.label())]
    EmptyDataset {
        /// The empty dataset.
        kind: DatasetKind,
    },

    /// No district matches the lookup.
    #[error("district '{district}'{} not found", .state.as_ref().map(|s| format!(" in state '{s}'")).unwrap_or_default())]
    DistrictNotFound {
        /// District name as requested.
        district: String,
        /// State name as requested, if any.
        state: Option<String>,
    },

    /// A district name without a state matches districts in several states.
    #[error("district '{district}' exists in several states ({}); specify a state", .states.join(", "))]
    AmbiguousDistrict {
        /// District name as requested.
        district: String,
        /// Every state containing a district with that name.
        states: Vec<String>,
    },
}
