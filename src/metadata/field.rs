//! Metadata field keys (`schema.element[.qualifier]`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Qualifier segment that matches any qualifier, including none.
pub const ANY_QUALIFIER: &str = "*";

/// Errors from parsing a dotted field key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldKeyError {
    #[error("empty metadata field key")]
    Empty,

    #[error("metadata field key '{0}' needs at least schema and element")]
    TooFewSegments(String),

    #[error("metadata field key '{0}' has more than three segments")]
    TooManySegments(String),

    #[error("metadata field key '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("metadata field key '{0}' uses a wildcard where a concrete field is required")]
    Wildcard(String),
}

/// Identifies a metadata field: schema, element and optional qualifier.
///
/// A qualifier of [`ANY_QUALIFIER`] turns the key into a pattern that
/// matches every qualifier of the element. Schema and element are always
/// concrete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetadataFieldKey {
    schema: String,
    element: String,
    qualifier: Option<String>,
}

impl MetadataFieldKey {
    /// Build a key from its parts.
    ///
    /// An empty qualifier is treated as absent.
    pub fn new(
        schema: impl Into<String>,
        element: impl Into<String>,
        qualifier: Option<&str>,
    ) -> Result<Self, FieldKeyError> {
        let schema = schema.into();
        let element = element.into();
        let qualifier = qualifier.filter(|q| !q.is_empty()).map(str::to_string);
        let key = Self { schema, element, qualifier };

        if key.schema.is_empty() || key.element.is_empty() {
            return Err(FieldKeyError::EmptySegment(key.to_string()));
        }
        if key.schema == ANY_QUALIFIER || key.element == ANY_QUALIFIER {
            return Err(FieldKeyError::Wildcard(key.to_string()));
        }
        Ok(key)
    }

    /// Parse a key and reject qualifier wildcards.
    pub fn parse_concrete(s: &str) -> Result<Self, FieldKeyError> {
        let key: Self = s.parse()?;
        if key.is_wildcard() {
            return Err(FieldKeyError::Wildcard(s.to_string()));
        }
        Ok(key)
    }

    /// The `dc.title` field.
    pub fn title() -> Self {
        Self {
            schema: "dc".to_string(),
            element: "title".to_string(),
            qualifier: None,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// True when the qualifier is the `*` wildcard
    pub fn is_wildcard(&self) -> bool {
        self.qualifier.as_deref() == Some(ANY_QUALIFIER)
    }

    /// Whether a concrete field is selected by this key.
    ///
    /// Without a wildcard this is plain equality. `dc.contributor.*`
    /// matches `dc.contributor`, `dc.contributor.author`, and so on.
    pub fn matches(&self, field: &MetadataFieldKey) -> bool {
        if self.schema != field.schema || self.element != field.element {
            return false;
        }
        self.is_wildcard() || self.qualifier == field.qualifier
    }
}

impl fmt::Display for MetadataFieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}.{}", self.schema, self.element, q),
            None => write!(f, "{}.{}", self.schema, self.element),
        }
    }
}

impl FromStr for MetadataFieldKey {
    type Err = FieldKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(FieldKeyError::Empty);
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(FieldKeyError::EmptySegment(trimmed.to_string()));
        }

        match parts.as_slice() {
            [schema, element] => Self::new(*schema, *element, None),
            [schema, element, qualifier] => Self::new(*schema, *element, Some(*qualifier)),
            [_] => Err(FieldKeyError::TooFewSegments(trimmed.to_string())),
            _ => Err(FieldKeyError::TooManySegments(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for MetadataFieldKey {
    type Error = FieldKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetadataFieldKey> for String {
    fn from(key: MetadataFieldKey) -> Self {
        key.to_string()
    }
}
