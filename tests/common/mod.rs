//! Shared fixtures for the fill engine integration tests

#![allow(dead_code)]

use metafill::{
    Confidence, ItemId, ItemStore, LanguageFilter, MemoryStore, MemoryUnit, MetadataFieldKey, MetadataStore,
    MetadataValue, StorageError, StorageResult, UnitOfWork, WorkUnit,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn key(s: &str) -> MetadataFieldKey {
    s.parse().unwrap()
}

/// Calls made against a [`RecordingStore`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get(String),
    Add(String, String),
    Clear(String),
}

/// MemoryStore wrapper that records every call and can fail writes to
/// chosen fields.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<StoreCall>>,
    failing_fields: Mutex<HashSet<String>>,
    adds: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every add to `field` fail
    pub fn fail_adds_to(&self, field: &str) {
        self.failing_fields.lock().unwrap().insert(field.to_string());
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn add_count(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Record an add and fail it if its field was marked failing
    fn check_add(&self, field: &MetadataFieldKey, value: &str) -> StorageResult<()> {
        self.record(StoreCall::Add(field.to_string(), value.to_string()));
        if self.failing_fields.lock().unwrap().contains(&field.to_string()) {
            return Err(StorageError::Backend(format!("injected failure on {}", field)));
        }
        self.adds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MetadataStore for RecordingStore {
    fn get_metadata(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        self.record(StoreCall::Get(field.to_string()));
        self.inner.get_metadata(owner, field)
    }

    fn add_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: Confidence,
    ) -> StorageResult<MetadataValue> {
        self.check_add(field, value)?;
        self.inner.add_metadata(target, field, language, value, authority, confidence)
    }

    fn clear_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        self.record(StoreCall::Clear(field.to_string()));
        self.inner.clear_metadata(target, field, language)
    }
}

impl ItemStore for RecordingStore {
    fn create_item(&self) -> StorageResult<ItemId> {
        self.inner.create_item()
    }

    fn has_item(&self, id: &ItemId) -> StorageResult<bool> {
        self.inner.has_item(id)
    }

    fn all_metadata(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        self.inner.all_metadata(id)
    }
}

impl UnitOfWork for RecordingStore {
    type Unit<'a> = RecordingUnit<'a>
    where
        Self: 'a;

    fn begin(&self) -> StorageResult<RecordingUnit<'_>> {
        Ok(RecordingUnit {
            store: self,
            inner: self.inner.begin()?,
        })
    }
}

/// Unit of work over a [`RecordingStore`]; records and fails like the store
pub struct RecordingUnit<'a> {
    store: &'a RecordingStore,
    inner: MemoryUnit<'a>,
}

impl MetadataStore for RecordingUnit<'_> {
    fn get_metadata(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        self.store.record(StoreCall::Get(field.to_string()));
        self.inner.get_metadata(owner, field)
    }

    fn add_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: Confidence,
    ) -> StorageResult<MetadataValue> {
        self.store.check_add(field, value)?;
        self.inner.add_metadata(target, field, language, value, authority, confidence)
    }

    fn clear_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        self.store.record(StoreCall::Clear(field.to_string()));
        self.inner.clear_metadata(target, field, language)
    }
}

impl ItemStore for RecordingUnit<'_> {
    fn create_item(&self) -> StorageResult<ItemId> {
        self.inner.create_item()
    }

    fn has_item(&self, id: &ItemId) -> StorageResult<bool> {
        self.inner.has_item(id)
    }

    fn all_metadata(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        self.inner.all_metadata(id)
    }
}

impl WorkUnit for RecordingUnit<'_> {
    fn commit(self) -> StorageResult<()> {
        self.inner.commit()
    }

    fn rollback(self) -> StorageResult<()> {
        self.inner.rollback()
    }
}

/// Add values to an item in order, returning them with their places
pub fn seed<S: MetadataStore + ?Sized>(store: &S, item: &ItemId, field: &str, values: &[&str]) -> Vec<MetadataValue> {
    values
        .iter()
        .map(|v| {
            store
                .add_metadata(item, &key(field), None, v, None, Confidence::UNSET)
                .unwrap()
        })
        .collect()
}

/// Literal values of an item at a field, in place order
pub fn literals<S: MetadataStore + ?Sized>(store: &S, item: &ItemId, field: &str) -> Vec<String> {
    store
        .get_metadata(item, &key(field))
        .unwrap()
        .into_iter()
        .map(|v| v.value)
        .collect()
}

/// A source and a target item in a fresh recording store
pub fn two_items() -> (RecordingStore, ItemId, ItemId) {
    let store = RecordingStore::new();
    let source = store.inner.create_item().unwrap();
    let target = store.inner.create_item().unwrap();
    (store, source, target)
}
