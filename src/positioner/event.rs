//! Events published by a state positioner.

use crate::core::LogicalState;
use crate::signal::RawValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The derived state changed.
///
/// Published only when the recomputed state differs from the previously
/// published one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub previous: LogicalState,
    pub current: LogicalState,
    pub timestamp: DateTime<Utc>,
}

/// A raw value arrived on one of the model's signals.
///
/// Delivered for every update, duplicates included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadbackEvent {
    pub signal: String,
    pub value: RawValue,
    pub timestamp: DateTime<Utc>,
}
