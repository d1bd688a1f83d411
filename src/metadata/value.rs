//! Metadata values and their owners

use super::field::MetadataFieldKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel value meaning "nothing recorded at this position".
///
/// Parallel fields (an author list and its affiliations) keep their places
/// aligned by storing this value in empty slots. It is never copied.
pub const PLACEHOLDER_VALUE: &str = "#PLACEHOLDER_PARENT_METADATA_VALUE#";

/// True if the value is the placeholder sentinel
pub fn is_placeholder(value: &str) -> bool {
    value == PLACEHOLDER_VALUE
}

/// Unique identifier for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new random ItemId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an ItemId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Authority-control confidence attached to a value.
///
/// The named levels are the ones authority plugins report; any other
/// score is carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(i32);

impl Confidence {
    pub const UNSET: Confidence = Confidence(-1);
    pub const NOVALUE: Confidence = Confidence(0);
    pub const REJECTED: Confidence = Confidence(100);
    pub const FAILED: Confidence = Confidence(200);
    pub const NOTFOUND: Confidence = Confidence(300);
    pub const AMBIGUOUS: Confidence = Confidence(400);
    pub const UNCERTAIN: Confidence = Confidence(500);
    pub const ACCEPTED: Confidence = Confidence(600);

    pub const fn new(score: i32) -> Self {
        Self(score)
    }

    pub const fn score(self) -> i32 {
        self.0
    }

    /// Name of the level, if the score is one of the well-known ones
    pub fn label(self) -> Option<&'static str> {
        match self.0 {
            -1 => Some("UNSET"),
            0 => Some("NOVALUE"),
            100 => Some("REJECTED"),
            200 => Some("FAILED"),
            300 => Some("NOTFOUND"),
            400 => Some("AMBIGUOUS"),
            500 => Some("UNCERTAIN"),
            600 => Some("ACCEPTED"),
            _ => None,
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{} ({})", label, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// A single field instance attached to an owning item.
///
/// `place` is the zero-based position among the owner's values for the
/// same field; stores keep it unique and contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub owner: ItemId,
    pub field: MetadataFieldKey,
    pub value: String,
    pub language: Option<String>,
    pub authority: Option<String>,
    pub confidence: Confidence,
    pub place: usize,
}

impl MetadataValue {
    /// Create a value with no language or authority at place 0
    pub fn new(owner: ItemId, field: MetadataFieldKey, value: impl Into<String>) -> Self {
        Self {
            owner,
            field,
            value: value.into(),
            language: None,
            authority: None,
            confidence: Confidence::UNSET,
            place: 0,
        }
    }

    pub fn with_place(mut self, place: usize) -> Self {
        self.place = place;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>, confidence: Confidence) -> Self {
        self.authority = Some(authority.into());
        self.confidence = confidence;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// True if the literal value is the placeholder sentinel
    pub fn is_placeholder(&self) -> bool {
        is_placeholder(&self.value)
    }
}
