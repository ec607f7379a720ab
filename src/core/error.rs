//! State model errors.

use thiserror::Error;

/// One problem found while validating a [`StateModelConfig`](super::StateModelConfig).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigViolation {
    #[error("State model defines no addressable states")]
    NoStates,

    #[error("State at position {index} has an empty name")]
    EmptyName { index: usize },

    #[error("State name '{name}' is reserved")]
    ReservedName { name: String },

    #[error("State '{name}' is defined more than once")]
    DuplicateState { name: String },

    #[error("Alias entry refers to unknown state '{state}'")]
    UnknownAliasTarget { state: String },

    #[error("Name '{alias}' maps to both '{first}' and '{second}'")]
    AliasCollision {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Rule table has no rules")]
    EmptyRules,

    #[error("Rule refers to undeclared signal '{signal}'")]
    UnknownSignal { signal: String },

    #[error("Signal '{signal}' has more than one rule in tier {tier}")]
    DuplicateRule { signal: String, tier: usize },

    #[error("Signal '{signal}' maps a value to unknown token '{token}'")]
    UnknownToken { signal: String, token: String },

    #[error("Signal '{signal}' maps value {value} more than once")]
    DuplicateCase { signal: String, value: String },
}

/// Errors raised by state model construction and lookups.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid state model ({} violation(s)): {}", .violations.len(), summarize(.violations))]
    Invalid { violations: Vec<ConfigViolation> },

    #[error("'{name}' is not a state of this model")]
    UnknownName { name: String },

    #[error("'{name}' is not an addressable state")]
    NotAddressable { name: String },

    #[error("State index {index} is out of range (1..={max})")]
    IndexOutOfRange { index: i64, max: usize },

    #[error("Failed to parse state model configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Whether this error rejects a requested target (as opposed to a broken model).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownName { .. } | Self::NotAddressable { .. } | Self::IndexOutOfRange { .. }
        )
    }
}

fn summarize(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
