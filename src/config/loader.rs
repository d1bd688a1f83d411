//! YAML configuration loading
//!
//! The document is parsed into string-keyed raw types first and then
//! validated, so that a bad field key is reported with where it appears:
//!
//! ```yaml
//! allows_update_by_default: false
//! configurations:
//!   dc.contributor.author:
//!     update_enabled: true
//!     mapping:
//!       person.affiliation.name:
//!         use_all: false
//!         target_metadata: oairecerif.author.affiliation
//! ```

use super::model::{FillConfig, MappingDetails, MetadataConfiguration};
use super::ConfigError;
use crate::metadata::MetadataFieldKey;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    allows_update_by_default: bool,
    #[serde(default)]
    configurations: BTreeMap<String, RawConfiguration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfiguration {
    #[serde(default)]
    update_enabled: Option<bool>,
    #[serde(default)]
    mapping: BTreeMap<String, RawMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMapping {
    #[serde(default)]
    use_all: bool,
    target_metadata: String,
}

fn field_at(key: &str, location: impl FnOnce() -> String) -> Result<MetadataFieldKey, ConfigError> {
    MetadataFieldKey::parse_concrete(key).map_err(|source| ConfigError::InvalidField {
        location: location(),
        source,
    })
}

fn build(raw: RawConfig) -> Result<FillConfig, ConfigError> {
    let mut config = FillConfig::new(raw.allows_update_by_default);

    for (trigger_key, raw_conf) in raw.configurations {
        let trigger = field_at(&trigger_key, || format!("configurations.{}", trigger_key))?;
        let mut conf = MetadataConfiguration {
            update_enabled: raw_conf.update_enabled,
            mapping: BTreeMap::new(),
        };

        for (target_key, raw_mapping) in raw_conf.mapping {
            let location = format!("configurations.{}.mapping.{}", trigger_key, target_key);
            let target = field_at(&target_key, || location.clone())?;
            let source = field_at(&raw_mapping.target_metadata, || format!("{}.target_metadata", location))?;
            conf.mapping.insert(target, MappingDetails::new(source, raw_mapping.use_all));
        }

        config = config.with_configuration(trigger, conf);
    }

    Ok(config)
}

impl FillConfig {
    /// Parse and validate a YAML configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        build(raw)
    }

    /// Read, parse and validate a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::debug!(path = %path.display(), triggers = config.len(), "loaded fill configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldKeyError;

    const AUTHOR_CONFIG: &str = r#"
allows_update_by_default: true
configurations:
  dc.contributor.author:
    update_enabled: false
    mapping:
      person.affiliation.name:
        target_metadata: oairecerif.author.affiliation
      oairecerif.person.email:
        use_all: true
        target_metadata: oairecerif.author.email
  dc.relation.funding: {}
"#;

    #[test]
    fn parses_full_document() {
        let config = FillConfig::from_yaml_str(AUTHOR_CONFIG).unwrap();
        assert!(config.allows_update_by_default);
        assert_eq!(config.len(), 2);

        let author = config.configuration_for_key("dc.contributor.author").unwrap();
        assert_eq!(author.update_enabled, Some(false));
        assert_eq!(author.mapping.len(), 2);

        let affiliation = &author.mapping[&"person.affiliation.name".parse().unwrap()];
        assert!(!affiliation.use_all);
        assert_eq!(affiliation.target_metadata.to_string(), "oairecerif.author.affiliation");

        let funding = config.configuration_for_key("dc.relation.funding").unwrap();
        assert_eq!(funding.update_enabled, None);
        assert!(funding.mapping.is_empty());
    }

    #[test]
    fn empty_document_fields_default() {
        let config = FillConfig::from_yaml_str("configurations: {}").unwrap();
        assert!(!config.allows_update_by_default);
        assert!(config.is_empty());
    }

    #[test]
    fn invalid_source_field_reports_location() {
        let yaml = r#"
configurations:
  dc.contributor.author:
    mapping:
      person.affiliation.name:
        target_metadata: affiliation
"#;
        match FillConfig::from_yaml_str(yaml) {
            Err(ConfigError::InvalidField { location, source }) => {
                assert_eq!(
                    location,
                    "configurations.dc.contributor.author.mapping.person.affiliation.name.target_metadata"
                );
                assert!(matches!(source, FieldKeyError::TooFewSegments(_)));
            }
            other => panic!("expected InvalidField, got {:?}", other),
        }
    }

    #[test]
    fn wildcard_trigger_is_rejected() {
        let yaml = "configurations:\n  dc.contributor.*: {}\n";
        assert!(matches!(
            FillConfig::from_yaml_str(yaml),
            Err(ConfigError::InvalidField { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "allow_update: true\n";
        assert!(matches!(FillConfig::from_yaml_str(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = FillConfig::load("/nonexistent/metafill.yaml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
