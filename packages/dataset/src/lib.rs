#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loader and validator for uploaded administrative datasets.
//!
//! Turns an uploaded CSV byte stream of a declared [`DatasetKind`] into
//! typed [`bli_dataset_models::RawRecord`]s. Every malformed row is
//! reported with its row number and column; nothing is silently dropped.

pub mod loader;
pub mod parsing;
pub mod progress;

use bli_dataset_models::{DatasetKind, RowRejection};
use thiserror::Error;

pub use loader::{DEFAULT_CHUNK_SIZE, LoadOptions, LoadedDataset, load};
pub use progress::{CancelToken, NullProgress, ProgressCallback, null_progress};

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The file, or too many of its rows, failed validation.
    #[error("{} file failed validation with {} defect(s)", .kind.label(), .rejections.len())]
    Validation {
        /// Declared kind of the file.
        kind: DatasetKind,
        /// Every defect found, in file order.
        rejections: Vec<RowRejection>,
    },

    /// The caller cancelled the load.
    #[error("{} load cancelled after {rows_read} rows", .kind.label())]
    Cancelled {
        /// Declared kind of the file.
        kind: DatasetKind,
        /// Rows read before the cancellation checkpoint.
        rows_read: u64,
    },
}
