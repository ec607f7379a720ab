//! Compiled rule tiers and the agreement resolution over them.
//!
//! All functions here are pure: they look only at the supplied raw values.

use crate::signal::RawValue;
use std::collections::BTreeMap;

/// Raw signal values keyed by signal name.
pub type RawValues = BTreeMap<String, RawValue>;

/// Validated rule token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Defer,
    State(usize),
}

#[derive(Clone, Debug)]
pub(crate) struct CompiledRule {
    pub(crate) signal: String,
    pub(crate) cases: Vec<(RawValue, Token)>,
}

impl CompiledRule {
    fn token_for(&self, value: &RawValue) -> Option<Token> {
        self.cases
            .iter()
            .find(|(case, _)| case == value)
            .map(|(_, token)| *token)
    }
}

/// Outcome of evaluating one tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TierVerdict {
    /// Every rule deferred.
    Defer,
    /// Every non-deferring rule agreed on this state index.
    State(usize),
    /// Rules disagreed, or a value was missing or unmapped.
    Conflict,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct CompiledTier {
    pub(crate) rules: Vec<CompiledRule>,
}

impl CompiledTier {
    pub(crate) fn evaluate(&self, raw: &RawValues) -> TierVerdict {
        let mut agreed: Option<usize> = None;
        for rule in &self.rules {
            let Some(token) = raw.get(&rule.signal).and_then(|value| rule.token_for(value)) else {
                return TierVerdict::Conflict;
            };
            match token {
                Token::Defer => continue,
                Token::State(index) => match agreed {
                    Some(previous) if previous != index => return TierVerdict::Conflict,
                    _ => agreed = Some(index),
                },
            }
        }
        agreed.map_or(TierVerdict::Defer, TierVerdict::State)
    }
}

/// Walk the tiers in order. `None` means the state is unknown.
pub(crate) fn evaluate_tiers(tiers: &[CompiledTier], raw: &RawValues) -> Option<usize> {
    for tier in tiers {
        match tier.evaluate(raw) {
            TierVerdict::Defer => continue,
            TierVerdict::State(index) => return Some(index),
            TierVerdict::Conflict => return None,
        }
    }
    None
}
