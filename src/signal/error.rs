//! Signal adapter errors.

use thiserror::Error;

/// Errors reported by a signal adapter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignalError {
    #[error("Signal '{signal}' is read-only")]
    ReadOnly { signal: String },

    #[error("Signal '{signal}' is not connected")]
    Disconnected { signal: String },

    #[error("Signal '{signal}' rejected the write: {reason}")]
    Rejected { signal: String, reason: String },

    #[error("Signal '{signal}' refused the write: {reason}")]
    PermissionDenied { signal: String, reason: String },

    #[error("No signal named '{signal}' is bound")]
    Missing { signal: String },
}
