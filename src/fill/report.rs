//! Per-call fill results
//!
//! A fill processes each mapping on its own. The report says which ones
//! changed the target, which had nothing to copy and which failed, so the
//! caller can decide whether a partial application is acceptable.

use super::select::EmptySelection;
use super::FillError;
use crate::metadata::{MetadataFieldKey, MetadataValue};
use crate::storage::StorageError;
use std::fmt;

/// What happened to one mapping
#[derive(Debug)]
pub enum MappingStatus {
    /// Target field was cleared and the selected values added
    Applied { cleared: usize, added: usize },
    /// Nothing was selected; the target was not touched
    Skipped(EmptySelection),
    /// A store call failed; the target field may be partially written
    Failed(StorageError),
}

/// Outcome of a single mapping entry
#[derive(Debug)]
pub struct MappingOutcome {
    /// Field written on the target item
    pub target_field: MetadataFieldKey,
    /// Field read on the source item
    pub source_field: MetadataFieldKey,
    pub status: MappingStatus,
}

impl MappingOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, MappingStatus::Failed(_))
    }
}

impl fmt::Display for MappingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}: ", self.target_field, self.source_field)?;
        match &self.status {
            MappingStatus::Applied { cleared, added } => {
                write!(f, "applied ({} cleared, {} added)", cleared, added)
            }
            MappingStatus::Skipped(reason) => write!(f, "skipped ({})", reason),
            MappingStatus::Failed(err) => write!(f, "failed ({})", err),
        }
    }
}

/// A mapping that failed, detached from its report
#[derive(Debug)]
pub struct MappingFailure {
    pub target_field: MetadataFieldKey,
    pub error: StorageError,
}

/// Result of one `fill_item` call
#[derive(Debug, Default)]
pub struct FillReport {
    /// Whether a configuration existed for the trigger field
    pub configured: bool,
    /// The title written on the target
    pub title: Option<MetadataValue>,
    /// One entry per configured mapping, in mapping order
    pub mappings: Vec<MappingOutcome>,
}

impl FillReport {
    /// Report for a trigger with no configuration
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// True if the call made no change at all
    pub fn is_noop(&self) -> bool {
        self.title.is_none() && self.applied_count() == 0
    }

    /// True if no mapping failed
    pub fn is_complete(&self) -> bool {
        !self.mappings.iter().any(MappingOutcome::is_failed)
    }

    /// Number of mappings that changed the target
    pub fn applied_count(&self) -> usize {
        self.mappings
            .iter()
            .filter(|m| matches!(m.status, MappingStatus::Applied { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &MappingOutcome> {
        self.mappings.iter().filter(|m| m.is_failed())
    }

    /// Turn any mapping failure into an error.
    pub fn into_result(self) -> Result<Self, FillError> {
        if self.is_complete() {
            return Ok(self);
        }

        let failed = self
            .mappings
            .into_iter()
            .filter_map(|outcome| match outcome.status {
                MappingStatus::Failed(error) => Some(MappingFailure {
                    target_field: outcome.target_field,
                    error,
                }),
                _ => None,
            })
            .collect();
        Err(FillError::Incomplete { failed })
    }
}
