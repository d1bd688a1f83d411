//! Fill configuration and its YAML loader

mod loader;
mod model;

pub use model::{FillConfig, MappingDetails, MetadataConfiguration};

use crate::metadata::FieldKeyError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading a fill configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid field key at {location}: {source}")]
    InvalidField {
        location: String,
        #[source]
        source: FieldKeyError,
    },
}
