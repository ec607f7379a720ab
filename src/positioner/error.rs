//! Positioner errors.

use crate::core::ModelError;
use crate::signal::SignalError;
use thiserror::Error;

/// Errors raised synchronously by a move request.
///
/// Failures that happen after the request was accepted (timeouts, adapter
/// rejections) are reported through the returned
/// [`StateStatus`](crate::status::StateStatus) instead.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("Invalid move target: {0}")]
    Validation(#[from] ModelError),

    #[error("Move of '{positioner}' to '{target}' not permitted: {reason}")]
    Permission {
        positioner: String,
        target: String,
        reason: String,
    },

    #[error("Positioner '{positioner}' has no command signal or move action")]
    Unsupported { positioner: String },

    #[error("Move could not be commanded: {0}")]
    Signal(SignalError),
}

impl MoveError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Permission { .. })
    }
}

/// Errors that can occur when building a positioner.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("State model not specified. Call .model(model) or .config(config) before .build()")]
    MissingModel,

    #[error("Signal '{signal}' is read by the state model but was not bound")]
    MissingSignal { signal: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}
