//! Settled results of a state status.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Why a status failed.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum StatusError {
    #[error("Timed out after {timeout:?} waiting for '{target}'")]
    Timeout { target: String, timeout: Duration },

    #[error("Move to '{target}' was cancelled")]
    Cancelled { target: String },

    #[error("Adapter rejected move to '{target}': {reason}")]
    Adapter { target: String, reason: String },
}

/// Final result of a status. Once set it never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failed(StatusError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn error(&self) -> Option<&StatusError> {
        match self {
            Self::Success => None,
            Self::Failed(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<(), StatusError> {
        match self {
            Self::Success => Ok(()),
            Self::Failed(error) => Err(error),
        }
    }
}
