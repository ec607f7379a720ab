//! Statekeeper: state reconciliation for multi-state devices
//!
//! Statekeeper derives one discrete logical state from a set of independently
//! updating hardware signals, commands transitions to a requested state, and
//! reports completion through a cancellable, callback-driven status.
//!
//! Following the "pure core, imperative shell" split, state derivation is a
//! pure function over raw values ([`core`]), while reading signals,
//! publishing changes and tracking moves live in the shell
//! ([`positioner`], [`status`]).
//!
//! # Core Concepts
//!
//! - **Signal**: an observable, optionally writable hardware value
//! - **State model**: states, aliases and the rules mapping signal values to a state
//! - **State positioner**: binds a model to live signals and commands moves
//! - **State status**: one-shot tracker settling when the target is observed
//!
//! # Example
//!
//! ```rust
//! use statekeeper::core::{LogicalState, StateModelConfig};
//! use statekeeper::positioner::PositionerBuilder;
//! use statekeeper::signal::{MemorySignal, SignalError, SignalSet};
//! use statekeeper::state_rules;
//! use std::sync::Arc;
//!
//! let lowlim = Arc::new(MemorySignal::new("lowlim", 1));
//! let highlim = Arc::new(MemorySignal::new("highlim", 1));
//!
//! let positioner = PositionerBuilder::new("lim")
//!     .config(
//!         StateModelConfig::rules([state_rules! {
//!             "lowlim" => { 0 => "in", 1 => "defer" },
//!             "highlim" => { 0 => "out", 1 => "defer" },
//!         }])
//!         .with_alias("in", "IN")
//!         .with_alias("out", "OUT"),
//!     )
//!     .signal("lowlim", lowlim.clone())
//!     .signal("highlim", highlim.clone())
//!     .move_action(|target: &LogicalState, signals: &SignalSet| -> Result<(), SignalError> {
//!         let inserting = target.name() == "in";
//!         signals.put("highlim", i64::from(inserting))?;
//!         signals.put("lowlim", i64::from(!inserting))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(positioner.position(), "Unknown");
//!
//! let status = positioner.move_to("OUT").unwrap();
//! assert!(status.success());
//! assert_eq!(positioner.position(), "OUT");
//! ```

pub mod core;
pub mod devices;
mod macros;
pub mod positioner;
pub mod signal;
pub mod status;
pub mod subscription;

// Re-export commonly used types
pub use crate::core::{LogicalState, MoveTarget, StateModel, StateModelConfig};
pub use positioner::{MoveError, MoveOptions, PositionerBuilder, StatePositioner};
pub use signal::{MemorySignal, RawValue, Signal, SignalError};
pub use status::{Outcome, StateStatus, StatusError};
