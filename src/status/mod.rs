//! Completion tracking for commanded moves.
//!
//! A [`StateStatus`] is a one-shot tracker bound to a target state. It
//! listens to its positioner's state changes and settles exactly once:
//! success when the target is observed, failure on timeout, cancellation or
//! adapter rejection. Settling always releases the subscription.

mod outcome;
mod state_status;

pub use outcome::{Outcome, StatusError};
pub use state_status::StateStatus;
