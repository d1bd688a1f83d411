//! Choosing which source values a mapping copies

use crate::metadata::MetadataValue;
use std::fmt;

/// Why a mapping selected nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptySelection {
    /// The source item has no values at the mapped field
    NoSourceValues,
    /// The trigger's place is past the last source value
    PlaceOutOfRange { place: usize, available: usize },
    /// Every candidate was a placeholder
    OnlyPlaceholders,
}

impl fmt::Display for EmptySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSourceValues => write!(f, "no source values"),
            Self::PlaceOutOfRange { place, available } => {
                write!(f, "place {} out of range ({} source values)", place, available)
            }
            Self::OnlyPlaceholders => write!(f, "only placeholders"),
        }
    }
}

/// Outcome of selecting over one mapping's source values
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    Values(Vec<&'a MetadataValue>),
    Empty(EmptySelection),
}

impl<'a> Selection<'a> {
    pub fn values(&self) -> &[&'a MetadataValue] {
        match self {
            Self::Values(values) => values,
            Self::Empty(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}

/// Select source values for one mapping.
///
/// `source` must be ordered by place. With `use_all` every non-placeholder
/// value is selected. Otherwise the value at `trigger_place` is selected;
/// when it is a placeholder the scan moves forward to the first real
/// value after it, never backward.
pub fn select_values(source: &[MetadataValue], use_all: bool, trigger_place: usize) -> Selection<'_> {
    if source.is_empty() {
        return Selection::Empty(EmptySelection::NoSourceValues);
    }

    if use_all {
        let values: Vec<&MetadataValue> = source.iter().filter(|v| !v.is_placeholder()).collect();
        return if values.is_empty() {
            Selection::Empty(EmptySelection::OnlyPlaceholders)
        } else {
            Selection::Values(values)
        };
    }

    match source.get(trigger_place..) {
        Some(candidates) if !candidates.is_empty() => candidates
            .iter()
            .find(|v| !v.is_placeholder())
            .map(|v| Selection::Values(vec![v]))
            .unwrap_or(Selection::Empty(EmptySelection::OnlyPlaceholders)),
        _ => Selection::Empty(EmptySelection::PlaceOutOfRange {
            place: trigger_place,
            available: source.len(),
        }),
    }
}
