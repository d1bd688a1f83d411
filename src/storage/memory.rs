//! In-memory metadata store

use super::traits::{
    require_concrete, ItemStore, LanguageFilter, MetadataStore, StorageError, StorageResult, UnitOfWork, WorkUnit,
};
use crate::metadata::{Confidence, ItemId, MetadataFieldKey, MetadataValue};
use dashmap::DashMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Metadata store held entirely in memory.
///
/// Values are kept per item. Plain calls share the store; a unit of work
/// takes it exclusively and remembers each item's values before its first
/// write so `rollback` can put them back.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: DashMap<ItemId, Vec<MetadataValue>>,
    gate: RwLock<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items in the store
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn shared(&self) -> StorageResult<RwLockReadGuard<'_, ()>> {
        self.gate.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn exclusive(&self) -> StorageResult<RwLockWriteGuard<'_, ()>> {
        self.gate.write().map_err(|_| StorageError::LockPoisoned)
    }

    fn values_at(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        let values = self.items.get(owner).ok_or(StorageError::ItemNotFound(*owner))?;
        let mut selected: Vec<MetadataValue> = values
            .iter()
            .filter(|v| field.matches(&v.field))
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.field.cmp(&b.field).then(a.place.cmp(&b.place)));
        Ok(selected)
    }

    fn push_value(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: Confidence,
    ) -> StorageResult<MetadataValue> {
        require_concrete(field)?;
        let mut values = self.items.get_mut(target).ok_or(StorageError::ItemNotFound(*target))?;

        let place = values.iter().filter(|v| &v.field == field).count();
        let added = MetadataValue {
            owner: *target,
            field: field.clone(),
            value: value.to_string(),
            language: language.map(str::to_string),
            authority: authority.map(str::to_string),
            confidence,
            place,
        };
        values.push(added.clone());
        Ok(added)
    }

    fn remove_values(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        let mut values = self.items.get_mut(target).ok_or(StorageError::ItemNotFound(*target))?;

        let before = values.len();
        values.retain(|v| !(field.matches(&v.field) && language.matches(v.language.as_deref())));
        let removed = before - values.len();
        if removed > 0 {
            renumber(values.as_mut_slice());
        }
        Ok(removed)
    }

    fn insert_item(&self) -> ItemId {
        let id = ItemId::new();
        self.items.insert(id, Vec::new());
        id
    }

    fn sorted_values(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        let values = self.items.get(id).ok_or(StorageError::ItemNotFound(*id))?;
        let mut all = values.clone();
        all.sort_by(|a, b| a.field.cmp(&b.field).then(a.place.cmp(&b.place)));
        Ok(all)
    }
}

/// Sort by (field, place) and reassign places so each field runs 0..n
fn renumber(values: &mut [MetadataValue]) {
    values.sort_by(|a, b| a.field.cmp(&b.field).then(a.place.cmp(&b.place)));
    let mut current: Option<MetadataFieldKey> = None;
    let mut next = 0;
    for value in values.iter_mut() {
        if current.as_ref() != Some(&value.field) {
            current = Some(value.field.clone());
            next = 0;
        }
        value.place = next;
        next += 1;
    }
}

impl MetadataStore for MemoryStore {
    fn get_metadata(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        let _shared = self.shared()?;
        self.values_at(owner, field)
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
        let _shared = self.shared()?;
        self.push_value(target, field, language, value, authority, confidence)
    }

    fn clear_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        let _shared = self.shared()?;
        self.remove_values(target, field, language)
    }
}

impl ItemStore for MemoryStore {
    fn create_item(&self) -> StorageResult<ItemId> {
        let _shared = self.shared()?;
        Ok(self.insert_item())
    }

    fn has_item(&self, id: &ItemId) -> StorageResult<bool> {
        let _shared = self.shared()?;
        Ok(self.items.contains_key(id))
    }

    fn all_metadata(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        let _shared = self.shared()?;
        self.sorted_values(id)
    }
}

impl UnitOfWork for MemoryStore {
    type Unit<'a> = MemoryUnit<'a>
    where
        Self: 'a;

    fn begin(&self) -> StorageResult<MemoryUnit<'_>> {
        let exclusive = self.exclusive()?;
        Ok(MemoryUnit {
            store: self,
            _exclusive: exclusive,
            saved: RefCell::new(HashMap::new()),
            created: RefCell::new(Vec::new()),
            open: true,
        })
    }
}

/// Exclusive unit of work over a [`MemoryStore`].
///
/// Dropping it without `commit` restores every item it changed and removes
/// the items it created.
pub struct MemoryUnit<'a> {
    store: &'a MemoryStore,
    _exclusive: RwLockWriteGuard<'a, ()>,
    saved: RefCell<HashMap<ItemId, Vec<MetadataValue>>>,
    created: RefCell<Vec<ItemId>>,
    open: bool,
}

impl MemoryUnit<'_> {
    /// Remember an item's values before the unit first changes them
    fn save(&self, id: &ItemId) {
        if self.created.borrow().contains(id) {
            return;
        }
        if let Some(values) = self.store.items.get(id) {
            self.saved.borrow_mut().entry(*id).or_insert_with(|| values.clone());
        }
    }

    fn restore(&mut self) {
        for id in self.created.take() {
            self.store.items.remove(&id);
        }
        for (id, values) in self.saved.take() {
            self.store.items.insert(id, values);
        }
    }
}

impl MetadataStore for MemoryUnit<'_> {
    fn get_metadata(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        self.store.values_at(owner, field)
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
        self.save(target);
        self.store.push_value(target, field, language, value, authority, confidence)
    }

    fn clear_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        self.save(target);
        self.store.remove_values(target, field, language)
    }
}

impl ItemStore for MemoryUnit<'_> {
    fn create_item(&self) -> StorageResult<ItemId> {
        let id = self.store.insert_item();
        self.created.borrow_mut().push(id);
        Ok(id)
    }

    fn has_item(&self, id: &ItemId) -> StorageResult<bool> {
        Ok(self.store.items.contains_key(id))
    }

    fn all_metadata(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        self.store.sorted_values(id)
    }
}

impl WorkUnit for MemoryUnit<'_> {
    fn commit(mut self) -> StorageResult<()> {
        self.open = false;
        Ok(())
    }

    fn rollback(mut self) -> StorageResult<()> {
        self.restore();
        self.open = false;
        Ok(())
    }
}

impl Drop for MemoryUnit<'_> {
    fn drop(&mut self) {
        if self.open {
            self.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn key(s: &str) -> MetadataFieldKey {
        s.parse().unwrap()
    }

    fn add(store: &MemoryStore, item: &ItemId, field: &str, value: &str, language: Option<&str>) -> MetadataValue {
        store
            .add_metadata(item, &key(field), language, value, None, Confidence::UNSET)
            .unwrap()
    }

    #[test]
    fn adds_land_on_next_place_per_field() {
        let store = MemoryStore::new();
        let item = store.create_item().unwrap();

        assert_eq!(add(&store, &item, "dc.title", "A", None).place, 0);
        assert_eq!(add(&store, &item, "dc.contributor.author", "X", None).place, 0);
        assert_eq!(add(&store, &item, "dc.contributor.author", "Y", None).place, 1);

        let authors = store.get_metadata_by_string(&item, "dc.contributor.author").unwrap();
        let values: Vec<_> = authors.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, vec!["X", "Y"]);
    }

    #[test]
    fn unknown_item_is_an_error() {
        let store = MemoryStore::new();
        let missing = ItemId::new();
        assert!(matches!(
            store.get_metadata(&missing, &key("dc.title")),
            Err(StorageError::ItemNotFound(id)) if id == missing
        ));
        assert!(store
            .add_metadata(&missing, &key("dc.title"), None, "x", None, Confidence::UNSET)
            .is_err());
    }

    #[test]
    fn wildcard_field_cannot_be_added() {
        let store = MemoryStore::new();
        let item = store.create_item().unwrap();
        let result = store.add_metadata(&item, &key("dc.contributor.*"), None, "x", None, Confidence::UNSET);
        assert!(matches!(result, Err(StorageError::InvalidField(_))));
    }

    #[test]
    fn clear_by_language_closes_gaps() {
        let store = MemoryStore::new();
        let item = store.create_item().unwrap();
        add(&store, &item, "dc.subject", "one", Some("en"));
        add(&store, &item, "dc.subject", "uno", Some("it"));
        add(&store, &item, "dc.subject", "two", Some("en"));

        let removed = store
            .clear_metadata(&item, &key("dc.subject"), &LanguageFilter::Is("it".into()))
            .unwrap();
        assert_eq!(removed, 1);

        let subjects = store.get_metadata(&item, &key("dc.subject")).unwrap();
        let placed: Vec<_> = subjects.iter().map(|v| (v.value.as_str(), v.place)).collect();
        assert_eq!(placed, vec![("one", 0), ("two", 1)]);
    }

    #[test]
    fn wildcard_clear_removes_every_qualifier() {
        let store = MemoryStore::new();
        let item = store.create_item().unwrap();
        add(&store, &item, "dc.contributor.author", "A", None);
        add(&store, &item, "dc.contributor.editor", "E", None);
        add(&store, &item, "dc.title", "T", None);

        let removed = store
            .clear_metadata(&item, &key("dc.contributor.*"), &LanguageFilter::Any)
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.all_metadata(&item).unwrap().len(), 1);
    }

    #[test]
    fn rollback_restores_changed_items() {
        let store = MemoryStore::new();
        let item = store.create_item().unwrap();
        add(&store, &item, "dc.title", "Before", None);

        let unit = store.begin().unwrap();
        unit.clear_metadata(&item, &key("dc.title"), &LanguageFilter::Any).unwrap();
        unit.add_metadata(&item, &key("dc.title"), None, "During", None, Confidence::UNSET).unwrap();
        let created = unit.create_item().unwrap();
        assert_eq!(unit.get_metadata(&item, &key("dc.title")).unwrap()[0].value, "During");
        unit.rollback().unwrap();

        let titles = store.get_metadata(&item, &key("dc.title")).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].value, "Before");
        assert!(!store.has_item(&created).unwrap());
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn dropped_unit_rolls_back() {
        let store = MemoryStore::new();
        let item = store.create_item().unwrap();
        {
            let unit = store.begin().unwrap();
            unit.add_metadata(&item, &key("dc.title"), None, "Lost", None, Confidence::UNSET).unwrap();
        }
        assert!(store.get_metadata(&item, &key("dc.title")).unwrap().is_empty());

        let unit = store.begin().unwrap();
        let created = unit.create_item().unwrap();
        unit.commit().unwrap();
        assert!(store.has_item(&created).unwrap());
        assert_eq!(store.item_count(), 2);
    }

    #[test]
    fn other_callers_wait_for_an_open_unit() {
        let store = MemoryStore::new();
        let mine = store.create_item().unwrap();
        let theirs = store.create_item().unwrap();
        let started = Barrier::new(2);

        thread::scope(|s| {
            let unit = store.begin().unwrap();
            unit.add_metadata(&mine, &key("dc.title"), None, "Discarded", None, Confidence::UNSET).unwrap();

            let other = s.spawn(|| {
                started.wait();
                store
                    .add_metadata(&theirs, &key("dc.title"), None, "Kept", None, Confidence::UNSET)
                    .unwrap();
            });
            started.wait();
            thread::sleep(Duration::from_millis(50));
            unit.rollback().unwrap();
            other.join().unwrap();
        });

        assert!(store.get_metadata(&mine, &key("dc.title")).unwrap().is_empty());
        let kept = store.get_metadata(&theirs, &key("dc.title")).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].value, "Kept");
    }

    #[test]
    fn store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryStore>();
    }
}
