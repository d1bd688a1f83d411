//! Fill configuration: per-trigger mapping rules

use crate::metadata::MetadataFieldKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// How one target field is filled from the source item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingDetails {
    /// Copy every eligible source value instead of the one at the
    /// trigger's place
    pub use_all: bool,
    /// Field read on the source item
    pub target_metadata: MetadataFieldKey,
}

impl MappingDetails {
    pub fn new(target_metadata: MetadataFieldKey, use_all: bool) -> Self {
        Self { use_all, target_metadata }
    }
}

/// Rules applied when a value of one trigger field is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataConfiguration {
    /// Whether existing target values may be overwritten; `None` defers
    /// to the engine default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_enabled: Option<bool>,
    /// Target field key to mapping details
    pub mapping: BTreeMap<MetadataFieldKey, MappingDetails>,
}

impl MetadataConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_update_enabled(mut self, enabled: bool) -> Self {
        self.update_enabled = Some(enabled);
        self
    }

    /// Add or replace the mapping for a target field
    pub fn with_mapping(mut self, target_field: MetadataFieldKey, details: MappingDetails) -> Self {
        self.mapping.insert(target_field, details);
        self
    }
}

/// Immutable engine configuration, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillConfig {
    /// Answer to `allows_update` when a configuration leaves it unset
    pub allows_update_by_default: bool,
    configurations: BTreeMap<MetadataFieldKey, MetadataConfiguration>,
}

impl FillConfig {
    pub fn new(allows_update_by_default: bool) -> Self {
        Self {
            allows_update_by_default,
            configurations: BTreeMap::new(),
        }
    }

    /// Add or replace the configuration for a trigger field
    pub fn with_configuration(mut self, trigger: MetadataFieldKey, configuration: MetadataConfiguration) -> Self {
        self.configurations.insert(trigger, configuration);
        self
    }

    /// Configuration registered for a trigger field
    pub fn configuration_for(&self, trigger: &MetadataFieldKey) -> Option<&MetadataConfiguration> {
        self.configurations.get(trigger)
    }

    /// Same as [`configuration_for`](Self::configuration_for) with a dotted
    /// key; keys that do not parse have no configuration.
    pub fn configuration_for_key(&self, key: &str) -> Option<&MetadataConfiguration> {
        let field: MetadataFieldKey = key.parse().ok()?;
        self.configuration_for(&field)
    }

    /// Trigger fields in key order
    pub fn triggers(&self) -> impl Iterator<Item = (&MetadataFieldKey, &MetadataConfiguration)> {
        self.configurations.iter()
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}
