//! The metadata fill engine
//!
//! When an authority value on a source item is picked to enrich a target
//! item, the engine copies the configured fields from source to target.

mod engine;
mod report;
mod select;

pub use engine::FillEngine;
pub use report::{FillReport, MappingFailure, MappingOutcome, MappingStatus};
pub use select::{select_values, EmptySelection, Selection};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that end a fill
#[derive(Debug, Error)]
pub enum FillError {
    #[error("Failed to record title: {0}")]
    Title(#[source] StorageError),

    #[error("{} mapping(s) failed: {}", failed.len(), describe(failed))]
    Incomplete { failed: Vec<MappingFailure> },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn describe(failed: &[MappingFailure]) -> String {
    failed
        .iter()
        .map(|f| format!("{} ({})", f.target_field, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for fill operations
pub type FillResult<T> = Result<T, FillError>;
