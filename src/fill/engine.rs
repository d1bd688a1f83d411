//! FillEngine: applies fill configuration to a target item

use super::report::{FillReport, MappingOutcome, MappingStatus};
use super::select::{select_values, Selection};
use super::{FillError, FillResult};
use crate::config::{FillConfig, MappingDetails, MetadataConfiguration};
use crate::metadata::{Confidence, ItemId, MetadataFieldKey, MetadataValue};
use crate::storage::{ItemStore, LanguageFilter, MetadataStore, StorageResult, UnitOfWork, WorkUnit};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Copies metadata from an authority's source item onto a target item.
///
/// The engine holds only its configuration; every call works against the
/// store it is given. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct FillEngine {
    config: Arc<FillConfig>,
}

impl FillEngine {
    pub fn new(config: impl Into<Arc<FillConfig>>) -> Self {
        Self { config: config.into() }
    }

    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    /// Configuration for the trigger's field, if any
    pub fn configuration_for(&self, trigger: &MetadataValue) -> Option<&MetadataConfiguration> {
        self.config.configuration_for(&trigger.field)
    }

    /// Whether existing values may be overwritten for this trigger.
    ///
    /// No configuration means `false`; otherwise the configuration's
    /// `update_enabled` wins over the engine default.
    pub fn allows_update(&self, trigger: &MetadataValue) -> bool {
        match self.configuration_for(trigger) {
            None => false,
            Some(conf) => conf.update_enabled.unwrap_or(self.config.allows_update_by_default),
        }
    }

    /// Fill `target` from the trigger's owning item.
    ///
    /// Without a configuration for the trigger field nothing is touched.
    /// Otherwise the trigger value becomes the target's only `dc.title` and
    /// each mapping is applied independently; mapping failures are recorded
    /// in the report rather than stopping the remaining mappings. Only a
    /// failure to write the title is returned as an error.
    pub fn fill_item<S>(&self, store: &S, trigger: &MetadataValue, target: &ItemId) -> FillResult<FillReport>
    where
        S: MetadataStore + ?Sized,
    {
        let conf = match self.configuration_for(trigger) {
            Some(conf) => conf,
            None => {
                debug!(trigger = %trigger.field, "no fill configuration for trigger field");
                return Ok(FillReport::unconfigured());
            }
        };

        let title = Self::set_title(store, trigger, target).map_err(FillError::Title)?;
        let mut report = FillReport {
            configured: true,
            title: Some(title),
            mappings: Vec::with_capacity(conf.mapping.len()),
        };

        // The trigger's owner holds the values its place indexes into.
        let source = trigger.owner;
        for (target_field, details) in &conf.mapping {
            let status = match Self::apply_mapping(store, &source, trigger.place, target, target_field, details) {
                Ok(status) => status,
                Err(err) => {
                    warn!(target_field = %target_field, error = %err, "fill mapping failed");
                    MappingStatus::Failed(err)
                }
            };
            report.mappings.push(MappingOutcome {
                target_field: target_field.clone(),
                source_field: details.target_metadata.clone(),
                status,
            });
        }

        info!(
            trigger = %trigger.field,
            target_item = %target,
            applied = report.applied_count(),
            mappings = report.mappings.len(),
            complete = report.is_complete(),
            "filled item"
        );
        Ok(report)
    }

    /// Run [`fill_item`](Self::fill_item) as one unit of work.
    ///
    /// Commits only when the title and every mapping succeeded; otherwise
    /// rolls back and returns the error. Other callers of the store wait
    /// while the unit is open.
    pub fn fill_item_atomic<S>(&self, store: &S, trigger: &MetadataValue, target: &ItemId) -> FillResult<FillReport>
    where
        S: UnitOfWork + ?Sized,
    {
        let unit = store.begin()?;
        let outcome = self.fill_item(&unit, trigger, target);
        Self::finish(unit, outcome)
    }

    /// Create a new target item and fill it, all in one unit of work.
    ///
    /// On failure the new item is rolled back with everything else.
    pub fn fill_new_item_atomic<S>(&self, store: &S, trigger: &MetadataValue) -> FillResult<(ItemId, FillReport)>
    where
        S: UnitOfWork + ?Sized,
    {
        let unit = store.begin()?;
        // Dropping the unit on an early return rolls it back.
        let target = unit.create_item()?;
        let outcome = self.fill_item(&unit, trigger, &target);
        Self::finish(unit, outcome).map(|report| (target, report))
    }

    fn finish<U: WorkUnit>(unit: U, outcome: FillResult<FillReport>) -> FillResult<FillReport> {
        match outcome.and_then(FillReport::into_result) {
            Ok(report) => {
                unit.commit()?;
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback() {
                    warn!(error = %rollback_err, "rollback after failed fill also failed");
                }
                Err(err)
            }
        }
    }

    fn set_title<S>(store: &S, trigger: &MetadataValue, target: &ItemId) -> StorageResult<MetadataValue>
    where
        S: MetadataStore + ?Sized,
    {
        let title = MetadataFieldKey::title();
        store.clear_metadata(target, &title, &LanguageFilter::Any)?;
        store.add_metadata(target, &title, None, &trigger.value, None, Confidence::UNSET)
    }

    fn apply_mapping<S>(
        store: &S,
        source: &ItemId,
        trigger_place: usize,
        target: &ItemId,
        target_field: &MetadataFieldKey,
        details: &MappingDetails,
    ) -> StorageResult<MappingStatus>
    where
        S: MetadataStore + ?Sized,
    {
        let source_values = store.get_metadata(source, &details.target_metadata)?;

        let selected = match select_values(&source_values, details.use_all, trigger_place) {
            Selection::Values(values) => values,
            Selection::Empty(reason) => {
                debug!(
                    target_field = %target_field,
                    source_field = %details.target_metadata,
                    %reason,
                    "nothing selected"
                );
                return Ok(MappingStatus::Skipped(reason));
            }
        };

        let cleared = store.clear_metadata(target, target_field, &LanguageFilter::Any)?;
        for value in &selected {
            store.add_metadata(
                target,
                target_field,
                None,
                &value.value,
                value.authority.as_deref(),
                value.confidence,
            )?;
        }

        debug!(
            target_field = %target_field,
            source_field = %details.target_metadata,
            cleared,
            added = selected.len(),
            "mapping applied"
        );
        Ok(MappingStatus::Applied {
            cleared,
            added: selected.len(),
        })
    }
}
