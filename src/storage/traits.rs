//! Storage trait definitions

use crate::metadata::{Confidence, FieldKeyError, ItemId, MetadataFieldKey, MetadataValue};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Invalid metadata field: {0}")]
    InvalidField(#[from] FieldKeyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Unit of work error: {0}")]
    Transaction(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Which languages a clear applies to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LanguageFilter {
    /// Every value regardless of language
    #[default]
    Any,
    /// Only values without a language
    Unset,
    /// Only values in exactly this language
    Is(String),
}

impl LanguageFilter {
    pub fn matches(&self, language: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Unset => language.is_none(),
            Self::Is(lang) => language == Some(lang.as_str()),
        }
    }
}

/// The metadata operations the fill engine needs from a repository.
///
/// Implementations keep `place` unique and contiguous per (owner, field):
/// adds land on the next free place, and removals close the gaps they
/// leave. Store types themselves are `Send + Sync`; the handles a
/// [`UnitOfWork`] hands out are tied to the thread that opened them.
pub trait MetadataStore {
    /// Values of `owner` at `field` ordered by field then place.
    ///
    /// `field` may carry a `*` qualifier to select every qualifier of the
    /// element.
    fn get_metadata(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>>;

    /// Same as [`get_metadata`](Self::get_metadata) with a dotted key string
    fn get_metadata_by_string(&self, owner: &ItemId, key: &str) -> StorageResult<Vec<MetadataValue>> {
        let field: MetadataFieldKey = key.parse()?;
        self.get_metadata(owner, &field)
    }

    /// Append a value to `target` at `field`, returning it with its place.
    ///
    /// `field` must be concrete.
    fn add_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: Confidence,
    ) -> StorageResult<MetadataValue>;

    /// Remove the values of `target` at `field` whose language matches.
    ///
    /// Returns how many values were removed.
    fn clear_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize>;
}

/// Item-level operations used to set up and inspect a store
pub trait ItemStore: MetadataStore {
    /// Create an empty item
    fn create_item(&self) -> StorageResult<ItemId>;

    /// Check if an item exists
    fn has_item(&self, id: &ItemId) -> StorageResult<bool>;

    /// Every value of an item, ordered by field then place
    fn all_metadata(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>>;
}

/// A store that can group writes into one all-or-nothing unit.
///
/// `begin` hands out a [`WorkUnit`] holding exclusive write access to the
/// store. Other callers block until the unit is committed, rolled back or
/// dropped, so their writes never land inside someone else's unit. A unit
/// dropped without `commit` is rolled back.
///
/// The thread holding a unit must go through that unit: calling the store
/// itself (or `begin` again) from the same thread blocks forever.
pub trait UnitOfWork: ItemStore {
    type Unit<'a>: WorkUnit
    where
        Self: 'a;

    fn begin(&self) -> StorageResult<Self::Unit<'_>>;
}

/// An open unit of work. Reads see the unit's own writes.
pub trait WorkUnit: ItemStore {
    fn commit(self) -> StorageResult<()>;

    fn rollback(self) -> StorageResult<()>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: MetadataStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}

/// Reject wildcard keys where a single concrete field is required
pub(crate) fn require_concrete(field: &MetadataFieldKey) -> StorageResult<()> {
    if field.is_wildcard() {
        return Err(FieldKeyError::Wildcard(field.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_filter_matching() {
        assert!(LanguageFilter::Any.matches(None));
        assert!(LanguageFilter::Any.matches(Some("en")));
        assert!(LanguageFilter::Unset.matches(None));
        assert!(!LanguageFilter::Unset.matches(Some("en")));
        assert!(LanguageFilter::Is("en".into()).matches(Some("en")));
        assert!(!LanguageFilter::Is("en".into()).matches(Some("it")));
        assert!(!LanguageFilter::Is("en".into()).matches(None));
    }
}
