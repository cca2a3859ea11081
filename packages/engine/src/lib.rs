#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Session API for the Biometric Lag Index engine.
//!
//! A [`Session`] owns the datasets uploaded by one caller, computes the
//! analysis snapshot on demand, and answers questions against it. Nothing
//! is shared between sessions and nothing outlives one.

pub mod config;
pub mod session;

use bli_analytics::AnalyticsError;
use bli_dataset::DatasetError;
use bli_dataset_models::{DatasetKind, RowRejection};
use thiserror::Error;

pub use bli_analytics_models::{
    AnalysisResult, DistrictAggregate, GapSeries, RiskLevel, SeasonalityProfile, StateAggregate,
};
pub use bli_assistant::{Answer, ChatHistory, ChatRole, ChatTurn};
pub use bli_dataset::{CancelToken, NullProgress, ProgressCallback};
pub use bli_dataset_models::IngestReport;
pub use config::EngineConfig;
pub use session::{IngestControl, Session, UploadStatus};

/// Errors returned by the session API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An upload is malformed. Fix the file and upload it again.
    #[error("{} file failed validation with {} defect(s)", .kind.label(), .rejections.len())]
    Validation {
        /// Declared kind of the file.
        kind: DatasetKind,
        /// Every defect found, in file order.
        rejections: Vec<RowRejection>,
    },

    /// The uploaded datasets cannot be joined.
    #[error("Join error: {0}")]
    Join(AnalyticsError),

    /// Analysis was requested before the datasets it needs were uploaded.
    #[error("No data: upload the {} dataset(s) first", .missing.iter().map(|k| k.label()).collect::<Vec<_>>().join(" and "))]
    NoData {
        /// Datasets still missing.
        missing: Vec<DatasetKind>,
    },

    /// A lookup named a district that is not in the data.
    #[error("Not found: {0}")]
    NotFound(AnalyticsError),

    /// The caller cancelled an upload. Nothing was committed.
    #[error("{} upload cancelled after {rows_read} rows", .kind.label())]
    Cancelled {
        /// Declared kind of the file.
        kind: DatasetKind,
        /// Rows read before cancellation.
        rows_read: u64,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

impl From<DatasetError> for EngineError {
    fn from(e: DatasetError) -> Self {
        match e {
            DatasetError::Validation { kind, rejections } => Self::Validation { kind, rejections },
            DatasetError::Cancelled { kind, rows_read } => Self::Cancelled { kind, rows_read },
        }
    }
}

impl From<AnalyticsError> for EngineError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::DisjointDates { .. } | AnalyticsError::EmptyDataset { .. } => {
                Self::Join(e)
            }
            AnalyticsError::DistrictNotFound { .. } | AnalyticsError::AmbiguousDistrict { .. } => {
                Self::NotFound(e)
            }
        }
    }
}
