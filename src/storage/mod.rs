//! Storage backends for metadata values
//!
//! The fill engine talks to storage only through the `MetadataStore` trait.
//! `SqliteStore` is the persistent implementation; `MemoryStore` keeps
//! everything in process and is what the tests run against.

mod memory;
mod sqlite;
mod traits;

pub use memory::{MemoryStore, MemoryUnit};
pub use sqlite::{SqliteStore, SqliteUnit};
pub use traits::{
    ItemStore, LanguageFilter, MetadataStore, OpenStore, StorageError, StorageResult, UnitOfWork,
    WorkUnit,
};
