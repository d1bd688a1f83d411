//! metafill: Rule-Driven Metadata Fill Engine
//!
//! When a repository authority value (an author, a funder, an
//! organisation) is chosen to enrich or create another item, metafill
//! decides field by field which values to copy from the item holding the
//! authority onto the target item.
//!
//! # Core Concepts
//!
//! - **Trigger value**: the metadata value whose selection starts a fill
//! - **Mapping**: one rule copying a source field to a target field, either
//!   every value or the one at the trigger's place
//! - **Placeholder**: the sentinel marking an empty slot; never copied
//!
//! # Example
//!
//! ```
//! use metafill::{
//!     Confidence, FillConfig, FillEngine, ItemStore, MappingDetails, MemoryStore,
//!     MetadataConfiguration, MetadataStore,
//! };
//!
//! let affiliation: metafill::MetadataFieldKey = "oairecerif.author.affiliation".parse().unwrap();
//! let config = FillConfig::new(false).with_configuration(
//!     "dc.contributor.author".parse().unwrap(),
//!     MetadataConfiguration::new()
//!         .with_mapping(affiliation.clone(), MappingDetails::new(affiliation.clone(), true)),
//! );
//! let engine = FillEngine::new(config);
//!
//! let store = MemoryStore::new();
//! let publication = store.create_item().unwrap();
//! let person = store.create_item().unwrap();
//! let author = store
//!     .add_metadata(&publication, &"dc.contributor.author".parse().unwrap(), None, "Mario Rossi", None, Confidence::UNSET)
//!     .unwrap();
//! store.add_metadata(&publication, &affiliation, None, "4Science", None, Confidence::UNSET).unwrap();
//!
//! let report = engine.fill_item(&store, &author, &person).unwrap();
//! assert!(report.is_complete());
//! assert_eq!(store.get_metadata(&person, &affiliation).unwrap()[0].value, "4Science");
//! ```

pub mod config;
pub mod fill;
pub mod metadata;
pub mod storage;

pub use config::{ConfigError, FillConfig, MappingDetails, MetadataConfiguration};
pub use fill::{FillEngine, FillError, FillReport, FillResult, MappingOutcome, MappingStatus};
pub use metadata::{Confidence, ItemId, MetadataFieldKey, MetadataValue, PLACEHOLDER_VALUE};
pub use storage::{
    ItemStore, LanguageFilter, MemoryStore, MemoryUnit, MetadataStore, OpenStore, SqliteStore, SqliteUnit,
    StorageError, StorageResult, UnitOfWork, WorkUnit,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
