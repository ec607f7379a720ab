//! Device-specific ways of commanding a state.

use crate::core::LogicalState;
use crate::signal::{SignalError, SignalSet};

/// Overrides the default "write the index to the command signal" behaviour.
///
/// Some devices express one state through several signals, e.g. setting two
/// limit bits to opposite values. Closures with the matching signature
/// implement this trait.
pub trait MoveAction: Send + Sync {
    fn command(&self, target: &LogicalState, signals: &SignalSet) -> Result<(), SignalError>;
}

impl<F> MoveAction for F
where
    F: Fn(&LogicalState, &SignalSet) -> Result<(), SignalError> + Send + Sync,
{
    fn command(&self, target: &LogicalState, signals: &SignalSet) -> Result<(), SignalError> {
        self(target, signals)
    }
}
