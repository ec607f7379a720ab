//! Logical states and move targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index reserved for the unknown sentinel.
pub const UNKNOWN_INDEX: usize = 0;

/// A discrete logical state derived from hardware signals.
///
/// Named states carry their 1-based position in the model's state list and
/// their primary name. The unknown sentinel always has index
/// [`UNKNOWN_INDEX`].
///
/// Values are produced by a [`StateModel`](super::StateModel); two states
/// from the same model are equal exactly when their indices are.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct LogicalState {
    index: usize,
    name: String,
}

impl LogicalState {
    pub(crate) fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    /// Position in the model's state list (1-based, 0 for unknown).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Primary name of the state.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unknown(&self) -> bool {
        self.index == UNKNOWN_INDEX
    }
}

impl fmt::Display for LogicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Requested destination of a move, by name or by index.
///
/// Names match primary names and aliases exactly (case-sensitive).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveTarget {
    Index(i64),
    Name(String),
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for MoveTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for MoveTarget {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<i64> for MoveTarget {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<i32> for MoveTarget {
    fn from(index: i32) -> Self {
        Self::Index(i64::from(index))
    }
}

impl From<usize> for MoveTarget {
    fn from(index: usize) -> Self {
        Self::Index(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl From<&LogicalState> for MoveTarget {
    fn from(state: &LogicalState) -> Self {
        Self::Name(state.name().to_string())
    }
}
