//! Declarative configuration for a state model.
//!
//! A [`StateModelConfig`] is plain data: it can be written in code, loaded
//! from JSON, or produced by the [`state_rules!`](crate::state_rules) macro.
//! Nothing is checked until it is handed to
//! [`StateModel::new`](super::StateModel::new).
//!
//! ```rust
//! use statekeeper::core::StateModelConfig;
//!
//! let config = StateModelConfig::from_json(r#"{
//!     "aliases": { "in": "IN", "out": "OUT" },
//!     "derivation": {
//!         "kind": "rules",
//!         "tiers": [[
//!             { "signal": "lowlim",  "cases": [{ "value": 0, "token": "in" },  { "value": 1, "token": "defer" }] },
//!             { "signal": "highlim", "cases": [{ "value": 0, "token": "out" }, { "value": 1, "token": "defer" }] }
//!         ]]
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(config.unknown, "Unknown");
//! ```

use super::error::ModelError;
use crate::signal::RawValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rule token meaning "this signal does not constrain the state".
pub const DEFER_TOKEN: &str = "defer";

/// Default label of the unknown sentinel.
pub const DEFAULT_UNKNOWN: &str = "Unknown";

fn default_unknown() -> String {
    DEFAULT_UNKNOWN.to_string()
}

/// One alias or several. The first alias is the state's display label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Aliases {
    One(String),
    Many(Vec<String>),
}

impl Aliases {
    pub fn names(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

impl From<&str> for Aliases {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<Vec<&str>> for Aliases {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(str::to_string).collect())
    }
}

/// Maps one raw value of a signal to a token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleCase {
    pub value: RawValue,
    pub token: String,
}

/// Per-signal rule: raw value to token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalRule {
    pub signal: String,
    pub cases: Vec<RuleCase>,
}

impl SignalRule {
    pub fn new<T: Into<String>>(
        signal: impl Into<String>,
        cases: impl IntoIterator<Item = (RawValue, T)>,
    ) -> Self {
        Self {
            signal: signal.into(),
            cases: cases
                .into_iter()
                .map(|(value, token)| RuleCase {
                    value,
                    token: token.into(),
                })
                .collect(),
        }
    }
}

/// Rules evaluated together. Later tiers are consulted only when every
/// token of this tier is `defer`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTier {
    pub rules: Vec<SignalRule>,
}

impl RuleTier {
    pub fn new(rules: Vec<SignalRule>) -> Self {
        Self { rules }
    }
}

/// How the current state is derived from signal values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// One signal reports the state directly, as a 1-based index or a name.
    Record { signal: String },
    /// Per-signal rule tables resolved by agreement.
    Rules { tiers: Vec<RuleTier> },
}

/// Immutable description of a state model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateModelConfig {
    /// Primary names by position. `None` reserves an index that can never be
    /// addressed. Empty under rule derivation means "use the rule tokens".
    #[serde(default)]
    pub states: Vec<Option<String>>,

    /// Primary name to alias(es).
    #[serde(default)]
    pub aliases: BTreeMap<String, Aliases>,

    /// Signals the model reads. Empty means "whatever the derivation names".
    #[serde(default)]
    pub signals: Vec<String>,

    pub derivation: Derivation,

    #[serde(default = "default_unknown")]
    pub unknown: String,
}

impl StateModelConfig {
    /// Model whose state is reported by a single signal.
    pub fn record<S: Into<String>>(
        signal: impl Into<String>,
        states: impl IntoIterator<Item = Option<S>>,
    ) -> Self {
        Self {
            states: states.into_iter().map(|s| s.map(Into::into)).collect(),
            aliases: BTreeMap::new(),
            signals: Vec::new(),
            derivation: Derivation::Record {
                signal: signal.into(),
            },
            unknown: default_unknown(),
        }
    }

    /// Model whose state is derived from rule tiers, in evaluation order.
    pub fn rules(tiers: impl IntoIterator<Item = RuleTier>) -> Self {
        Self {
            states: Vec::new(),
            aliases: BTreeMap::new(),
            signals: Vec::new(),
            derivation: Derivation::Rules {
                tiers: tiers.into_iter().collect(),
            },
            unknown: default_unknown(),
        }
    }

    pub fn with_states<S: Into<String>>(mut self, states: impl IntoIterator<Item = Option<S>>) -> Self {
        self.states = states.into_iter().map(|s| s.map(Into::into)).collect();
        self
    }

    pub fn with_alias(mut self, state: impl Into<String>, aliases: impl Into<Aliases>) -> Self {
        self.aliases.insert(state.into(), aliases.into());
        self
    }

    pub fn with_signals<S: Into<String>>(mut self, signals: impl IntoIterator<Item = S>) -> Self {
        self.signals = signals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unknown(mut self, label: impl Into<String>) -> Self {
        self.unknown = label.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Signals named by the derivation, in first-use order.
    pub(crate) fn derivation_signals(&self) -> Vec<String> {
        match &self.derivation {
            Derivation::Record { signal } => vec![signal.clone()],
            Derivation::Rules { tiers } => {
                let mut signals: Vec<String> = Vec::new();
                for rule in tiers.iter().flat_map(|tier| &tier.rules) {
                    if !signals.contains(&rule.signal) {
                        signals.push(rule.signal.clone());
                    }
                }
                signals
            }
        }
    }

    /// State names implied by rule tokens, in first-use order.
    ///
    /// `defer` and names listed as an alias of some state are skipped.
    pub(crate) fn token_states(&self) -> Vec<String> {
        let Derivation::Rules { tiers } = &self.derivation else {
            return Vec::new();
        };
        let is_alias = |token: &str| {
            self.aliases
                .values()
                .any(|aliases| aliases.names().iter().any(|alias| alias == token))
        };
        let mut states: Vec<String> = Vec::new();
        let tokens = tiers
            .iter()
            .flat_map(|tier| &tier.rules)
            .flat_map(|rule| &rule.cases)
            .map(|case| case.token.as_str());
        for token in tokens {
            if token != DEFER_TOKEN && !is_alias(token) && !states.iter().any(|s| s == token) {
                states.push(token.to_string());
            }
        }
        states
    }
}
