//! Pure core of the engine: states, rule tables and the state model.
//!
//! - [`LogicalState`] and [`MoveTarget`] name states and move requests
//! - [`StateModelConfig`] declares states, aliases and derivation rules
//! - [`StateModel`] validates a configuration once and resolves raw signal
//!   values to a logical state
//!
//! Nothing in this module touches a signal. Everything is a function of the
//! values handed in, so the whole rule table can be tested exhaustively.

mod config;
mod error;
mod model;
mod rules;
mod state;

pub use config::{
    Aliases, Derivation, RuleCase, RuleTier, SignalRule, StateModelConfig, DEFAULT_UNKNOWN,
    DEFER_TOKEN,
};
pub use error::{ConfigViolation, ModelError};
pub use model::StateModel;
pub use rules::RawValues;
pub use state::{LogicalState, MoveTarget, UNKNOWN_INDEX};
