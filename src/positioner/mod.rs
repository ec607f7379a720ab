//! State positioners: the public face of a multi-state device.
//!
//! A [`StatePositioner`] reads the signals its [`StateModel`](crate::core::StateModel)
//! needs, publishes [`StateChange`] events when the derived state changes,
//! and turns move requests into signal writes. Each accepted move returns a
//! [`StateStatus`](crate::status::StateStatus).
//!
//! Moves are validated in a fixed order, and nothing is written unless every
//! step passes:
//!
//! 1. the target must resolve to an addressable state
//! 2. every [`MoveGuard`] must pass
//! 3. the positioner must have a [`MoveAction`] or a command signal

mod action;
mod builder;
mod error;
mod event;
mod guard;
mod state_positioner;

pub use action::MoveAction;
pub use builder::PositionerBuilder;
pub use error::{BuildError, MoveError};
pub use event::{ReadbackEvent, StateChange};
pub use guard::MoveGuard;
pub use state_positioner::{MoveOptions, StatePositioner};
