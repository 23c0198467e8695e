//! Author position labels.
//!
//! The labelling rule is fixed by convention so that estimates stay comparable
//! with historical analyses:
//!
//! | authors | labels                                              |
//! |---------|-----------------------------------------------------|
//! | 1       | first                                               |
//! | 2       | first, last                                         |
//! | 3       | first, second, last                                 |
//! | 4       | first, second, penultimate, last                    |
//! | 5+      | first, second, other × (n − 4), penultimate, last   |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Position of an author within a paper's ordered author list.
///
/// The declaration order is the canonical display order, so `Ord` sorts
/// first < second < other < penultimate < last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    First,
    Second,
    Other,
    Penultimate,
    Last,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("'{0}' is not a recognized author position")]
pub struct UnknownPosition(pub String);

impl Position {
    pub const CANONICAL_ORDER: [Position; 5] = [
        Position::First,
        Position::Second,
        Position::Other,
        Position::Penultimate,
        Position::Last,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Other => "other",
            Self::Penultimate => "penultimate",
            Self::Last => "last",
        }
    }

    /// Label of the author at `index` in a list of `count` authors.
    ///
    /// Returns `None` when `index` is out of range.
    pub fn for_index(index: usize, count: usize) -> Option<Self> {
        if index >= count {
            return None;
        }
        let from_end = count - 1 - index;
        let label = match (count, index, from_end) {
            (_, 0, _) => Self::First,
            (_, _, 0) => Self::Last,
            (3.., 1, _) => Self::Second,
            (4.., _, 1) => Self::Penultimate,
            _ => Self::Other,
        };
        Some(label)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = UnknownPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "second" => Ok(Self::Second),
            "other" => Ok(Self::Other),
            "penultimate" => Ok(Self::Penultimate),
            "last" => Ok(Self::Last),
            _ => Err(UnknownPosition(s.to_string())),
        }
    }
}

/// Position labels for a paper with `count` authors, in author order.
pub fn position_labels(count: usize) -> Vec<Position> {
    (0..count)
        .filter_map(|index| Position::for_index(index, count))
        .collect()
}

/// Pairs every author with its position label, preserving input order.
pub fn assign_positions<T>(authors: Vec<T>) -> Vec<(T, Position)> {
    let labels = position_labels(authors.len());
    authors.into_iter().zip(labels).collect()
}
