//! Pre-move checks.
//!
//! Guards run after the target has been validated and before anything is
//! written. A failing guard turns into [`MoveError::Permission`](super::MoveError::Permission),
//! so device layers can refuse motion (a decoupled gantry, a tripped
//! interlock) without touching the default command path.

use crate::core::LogicalState;
use std::fmt;

/// Named predicate deciding whether a move to a target may proceed.
///
/// # Example
///
/// ```rust
/// use statekeeper::positioner::MoveGuard;
///
/// let guard = MoveGuard::new("never OUT", |target| {
///     if target.name() == "OUT" {
///         Err("OUT is locked".to_string())
///     } else {
///         Ok(())
///     }
/// });
/// assert_eq!(guard.name(), "never OUT");
/// ```
pub struct MoveGuard {
    name: String,
    check: Box<dyn Fn(&LogicalState) -> Result<(), String> + Send + Sync>,
}

impl MoveGuard {
    /// Create a guard. The closure returns the refusal reason on failure.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&LogicalState) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, target: &LogicalState) -> Result<(), String> {
        (self.check)(target)
    }
}

impl fmt::Debug for MoveGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveGuard").field("name", &self.name).finish()
    }
}
