//! The state model: enumeration, aliases and derivation rules.

use super::config::{Derivation, StateModelConfig, DEFER_TOKEN};
use super::error::{ConfigViolation, ModelError};
use super::rules::{evaluate_tiers, CompiledRule, CompiledTier, RawValues, Token};
use super::state::{LogicalState, MoveTarget, UNKNOWN_INDEX};
use crate::signal::RawValue;
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigViolation>>;

#[derive(Clone, Debug)]
struct Slot {
    name: String,
    aliases: Vec<String>,
}

#[derive(Clone, Debug)]
enum CompiledDerivation {
    Record { signal: String },
    Rules(Vec<CompiledTier>),
}

/// Validated, immutable state model.
///
/// [`StateModel::resolve`] is a pure function of the supplied raw values, so
/// every combination of signal values can be checked without hardware.
///
/// # Example
///
/// ```rust
/// use statekeeper::core::{RawValues, StateModel, StateModelConfig};
/// use statekeeper::signal::RawValue;
/// use statekeeper::state_rules;
///
/// let config = StateModelConfig::rules([state_rules! {
///     "lowlim" => { 0 => "in", 1 => "defer" },
///     "highlim" => { 0 => "out", 1 => "defer" },
/// }])
/// .with_alias("in", "IN")
/// .with_alias("out", "OUT");
/// let model = StateModel::new(config).unwrap();
///
/// let raw = RawValues::from([
///     ("lowlim".to_string(), RawValue::Int(1)),
///     ("highlim".to_string(), RawValue::Int(0)),
/// ]);
/// let state = model.resolve(&raw);
/// assert_eq!(state.name(), "out");
/// assert_eq!(model.label(&state), "OUT");
/// ```
#[derive(Clone, Debug)]
pub struct StateModel {
    unknown: String,
    slots: Vec<Option<Slot>>,
    lookup: HashMap<String, usize>,
    signals: Vec<String>,
    derivation: CompiledDerivation,
}

impl StateModel {
    /// Validate `config` and build the model.
    ///
    /// All violations are collected and reported together in
    /// [`ModelError::Invalid`].
    pub fn new(config: StateModelConfig) -> Result<Self, ModelError> {
        let mut checks: Vec<Check> = Vec::new();

        let names: Vec<Option<String>> = if config.states.is_empty() {
            config.token_states().into_iter().map(Some).collect()
        } else {
            config.states.clone()
        };

        let mut slots: Vec<Option<Slot>> = Vec::with_capacity(names.len());
        let mut lookup: HashMap<String, usize> = HashMap::new();
        for (offset, name) in names.into_iter().enumerate() {
            let index = offset + 1;
            let Some(name) = name else {
                slots.push(None);
                continue;
            };
            if name.is_empty() {
                checks.push(Validation::fail(ConfigViolation::EmptyName { index }));
            } else if is_reserved(&name, &config.unknown) {
                checks.push(Validation::fail(ConfigViolation::ReservedName { name: name.clone() }));
            } else if lookup.contains_key(&name) {
                checks.push(Validation::fail(ConfigViolation::DuplicateState { name: name.clone() }));
            } else {
                lookup.insert(name.clone(), index);
            }
            slots.push(Some(Slot {
                name,
                aliases: Vec::new(),
            }));
        }
        if lookup.is_empty() {
            checks.push(Validation::fail(ConfigViolation::NoStates));
        }

        let primaries = lookup.clone();
        for (state, aliases) in &config.aliases {
            let Some(&index) = primaries.get(state) else {
                checks.push(Validation::fail(ConfigViolation::UnknownAliasTarget {
                    state: state.clone(),
                }));
                continue;
            };
            for alias in aliases.names() {
                if is_reserved(alias, &config.unknown) {
                    checks.push(Validation::fail(ConfigViolation::ReservedName {
                        name: alias.clone(),
                    }));
                    continue;
                }
                match lookup.get(alias) {
                    Some(&existing) if existing != index => {
                        checks.push(Validation::fail(ConfigViolation::AliasCollision {
                            alias: alias.clone(),
                            first: slot_name(&slots, existing),
                            second: state.clone(),
                        }));
                    }
                    Some(_) => {}
                    None => {
                        lookup.insert(alias.clone(), index);
                    }
                }
                if let Some(Some(slot)) = slots.get_mut(index - 1) {
                    if !slot.aliases.contains(alias) {
                        slot.aliases.push(alias.clone());
                    }
                }
            }
        }

        let signals = if config.signals.is_empty() {
            config.derivation_signals()
        } else {
            config.signals.clone()
        };

        let derivation = match &config.derivation {
            Derivation::Record { signal } => {
                if !signals.contains(signal) {
                    checks.push(Validation::fail(ConfigViolation::UnknownSignal {
                        signal: signal.clone(),
                    }));
                }
                CompiledDerivation::Record {
                    signal: signal.clone(),
                }
            }
            Derivation::Rules { tiers } => {
                if tiers.iter().all(|tier| tier.rules.is_empty()) {
                    checks.push(Validation::fail(ConfigViolation::EmptyRules));
                }
                let mut compiled = Vec::with_capacity(tiers.len());
                for (tier_index, tier) in tiers.iter().enumerate() {
                    let mut rules: Vec<CompiledRule> = Vec::with_capacity(tier.rules.len());
                    for rule in &tier.rules {
                        if !signals.contains(&rule.signal) {
                            checks.push(Validation::fail(ConfigViolation::UnknownSignal {
                                signal: rule.signal.clone(),
                            }));
                        }
                        if rules.iter().any(|seen| seen.signal == rule.signal) {
                            checks.push(Validation::fail(ConfigViolation::DuplicateRule {
                                signal: rule.signal.clone(),
                                tier: tier_index,
                            }));
                        }
                        let mut cases: Vec<(RawValue, Token)> = Vec::with_capacity(rule.cases.len());
                        for case in &rule.cases {
                            if cases.iter().any(|(value, _)| *value == case.value) {
                                checks.push(Validation::fail(ConfigViolation::DuplicateCase {
                                    signal: rule.signal.clone(),
                                    value: case.value.to_string(),
                                }));
                                continue;
                            }
                            let token = if case.token == DEFER_TOKEN {
                                Token::Defer
                            } else if let Some(&index) = lookup.get(&case.token) {
                                Token::State(index)
                            } else {
                                checks.push(Validation::fail(ConfigViolation::UnknownToken {
                                    signal: rule.signal.clone(),
                                    token: case.token.clone(),
                                }));
                                continue;
                            };
                            cases.push((case.value.clone(), token));
                        }
                        rules.push(CompiledRule {
                            signal: rule.signal.clone(),
                            cases,
                        });
                    }
                    compiled.push(CompiledTier { rules });
                }
                CompiledDerivation::Rules(compiled)
            }
        };

        if let Validation::Failure(errors) = Validation::all_vec(checks).map(|_| ()) {
            return Err(ModelError::Invalid {
                violations: errors.iter().cloned().collect(),
            });
        }

        Ok(Self {
            unknown: config.unknown,
            slots,
            lookup,
            signals,
            derivation,
        })
    }

    /// Derive the logical state from raw signal values.
    ///
    /// Missing values, unmapped values and disagreeing rules all yield the
    /// unknown state. Unknown is a valid result, not an error.
    pub fn resolve(&self, raw: &RawValues) -> LogicalState {
        let index = match &self.derivation {
            CompiledDerivation::Rules(tiers) => evaluate_tiers(tiers, raw),
            CompiledDerivation::Record { signal } => raw.get(signal).and_then(|value| self.record_index(value)),
        };
        index
            .and_then(|index| self.state(index))
            .unwrap_or_else(|| self.unknown())
    }

    /// Index for a name or alias. The unknown label maps to index 0.
    pub fn name_to_index(&self, name: &str) -> Result<usize, ModelError> {
        if name == self.unknown {
            return Ok(UNKNOWN_INDEX);
        }
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownName {
                name: name.to_string(),
            })
    }

    /// Primary name for an index. Index 0 is the unknown label.
    pub fn index_to_name(&self, index: usize) -> Result<&str, ModelError> {
        if index == UNKNOWN_INDEX {
            return Ok(&self.unknown);
        }
        match self.slots.get(index - 1) {
            Some(Some(slot)) => Ok(&slot.name),
            Some(None) => Err(ModelError::NotAddressable {
                name: format!("#{index}"),
            }),
            None => Err(ModelError::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                max: self.slots.len(),
            }),
        }
    }

    /// Resolve a move target to an addressable state.
    ///
    /// The unknown sentinel, placeholder slots and `defer` are rejected.
    pub fn resolve_target(&self, target: &MoveTarget) -> Result<LogicalState, ModelError> {
        match target {
            MoveTarget::Name(name) if *name == self.unknown => Err(ModelError::NotAddressable {
                name: name.clone(),
            }),
            MoveTarget::Name(name) => {
                let index = self.name_to_index(name)?;
                self.state(index).ok_or_else(|| ModelError::NotAddressable {
                    name: name.clone(),
                })
            }
            MoveTarget::Index(index) => {
                if *index == 0 {
                    return Err(ModelError::NotAddressable {
                        name: self.unknown.clone(),
                    });
                }
                let in_range = usize::try_from(*index)
                    .ok()
                    .filter(|i| *i <= self.slots.len());
                let Some(position) = in_range else {
                    return Err(ModelError::IndexOutOfRange {
                        index: *index,
                        max: self.slots.len(),
                    });
                };
                self.state(position).ok_or_else(|| ModelError::NotAddressable {
                    name: format!("#{index}"),
                })
            }
        }
    }

    /// Addressable state at `index`, if any.
    pub fn state(&self, index: usize) -> Option<LogicalState> {
        let slot = self.slots.get(index.checked_sub(1)?)?.as_ref()?;
        Some(LogicalState::new(index, slot.name.clone()))
    }

    pub fn unknown(&self) -> LogicalState {
        LogicalState::new(UNKNOWN_INDEX, self.unknown.clone())
    }

    /// Display label: the first alias, else the primary name.
    pub fn label<'a>(&'a self, state: &'a LogicalState) -> &'a str {
        self.slot(state)
            .and_then(|slot| slot.aliases.first())
            .map_or(state.name(), String::as_str)
    }

    pub fn aliases(&self, state: &LogicalState) -> &[String] {
        self.slot(state)
            .map(|slot| slot.aliases.as_slice())
            .unwrap_or_default()
    }

    /// Every addressable state in index order.
    pub fn states(&self) -> impl Iterator<Item = LogicalState> + '_ {
        (1..=self.slots.len()).filter_map(|index| self.state(index))
    }

    /// Number of positions, placeholders included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Signals the model reads.
    pub fn signals(&self) -> &[String] {
        &self.signals
    }

    /// The signal reporting the state directly, for record-derived models.
    pub fn record_signal(&self) -> Option<&str> {
        match &self.derivation {
            CompiledDerivation::Record { signal } => Some(signal),
            CompiledDerivation::Rules(_) => None,
        }
    }

    fn slot(&self, state: &LogicalState) -> Option<&Slot> {
        self.slots.get(state.index().checked_sub(1)?)?.as_ref()
    }

    fn record_index(&self, value: &RawValue) -> Option<usize> {
        match value {
            RawValue::Text(name) => self.lookup.get(name).copied(),
            other => other.as_index().and_then(|index| usize::try_from(index).ok()),
        }
    }
}

fn is_reserved(name: &str, unknown: &str) -> bool {
    name == unknown || name == DEFER_TOKEN
}

fn slot_name(slots: &[Option<Slot>], index: usize) -> String {
    slots
        .get(index - 1)
        .and_then(|slot| slot.as_ref())
        .map(|slot| slot.name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{RuleTier, SignalRule};
    use crate::state_rules;

    fn limit_model() -> StateModel {
        let config = StateModelConfig::rules([state_rules! {
            "lowlim" => { 0 => "in", 1 => "defer" },
            "highlim" => { 0 => "out", 1 => "defer" },
        }])
        .with_alias("in", "IN")
        .with_alias("out", "OUT");
        StateModel::new(config).unwrap()
    }

    fn int_model() -> StateModel {
        let config = StateModelConfig::record("state", [None, Some("UNO"), Some("OUT")])
            .with_alias("UNO", vec!["IN", "in"]);
        StateModel::new(config).unwrap()
    }

    fn limits(low: i64, high: i64) -> RawValues {
        RawValues::from([
            ("lowlim".to_string(), RawValue::Int(low)),
            ("highlim".to_string(), RawValue::Int(high)),
        ])
    }

    fn violations(config: StateModelConfig) -> Vec<ConfigViolation> {
        match StateModel::new(config) {
            Err(ModelError::Invalid { violations }) => violations,
            other => panic!("expected invalid model, got {other:?}"),
        }
    }

    #[test]
    fn limit_switch_table_resolves() {
        let model = limit_model();
        assert!(model.resolve(&limits(1, 1)).is_unknown());
        assert_eq!(model.resolve(&limits(1, 0)).name(), "out");
        assert_eq!(model.resolve(&limits(0, 1)).name(), "in");
        assert!(model.resolve(&limits(0, 0)).is_unknown());
    }

    #[test]
    fn states_derived_from_tokens_are_one_based() {
        let model = limit_model();
        assert_eq!(model.name_to_index("in").unwrap(), 1);
        assert_eq!(model.name_to_index("OUT").unwrap(), 2);
        assert_eq!(model.index_to_name(2).unwrap(), "out");
    }

    #[test]
    fn unknown_is_addressable_by_lookup_but_defer_is_not() {
        let model = limit_model();
        assert_eq!(model.name_to_index("Unknown").unwrap(), UNKNOWN_INDEX);
        assert_eq!(model.index_to_name(UNKNOWN_INDEX).unwrap(), "Unknown");
        assert!(matches!(
            model.name_to_index("defer"),
            Err(ModelError::UnknownName { .. })
        ));
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let model = limit_model();
        assert!(model.name_to_index("Out").is_err());
        assert!(model.name_to_index("IN").is_ok());
    }

    #[test]
    fn record_model_uses_placeholder_offset() {
        let model = int_model();
        let raw = RawValues::from([("state".to_string(), RawValue::Int(2))]);
        let state = model.resolve(&raw);

        assert_eq!(state.name(), "UNO");
        assert_eq!(model.label(&state), "IN");
        assert_eq!(model.name_to_index("in").unwrap(), 2);
        assert_eq!(model.name_to_index("OUT").unwrap(), 3);
    }

    #[test]
    fn record_model_accepts_names_and_rejects_garbage() {
        let model = int_model();
        let by_name = RawValues::from([("state".to_string(), RawValue::from("IN"))]);
        assert_eq!(model.resolve(&by_name).name(), "UNO");

        for value in [RawValue::Int(1), RawValue::Int(9), RawValue::Float(1.23), RawValue::from("nope")] {
            let raw = RawValues::from([("state".to_string(), value)]);
            assert!(model.resolve(&raw).is_unknown());
        }
    }

    #[test]
    fn resolve_target_rejects_unaddressable_names() {
        let model = int_model();
        assert!(matches!(
            model.resolve_target(&MoveTarget::from("Unknown")),
            Err(ModelError::NotAddressable { .. })
        ));
        assert!(matches!(
            model.resolve_target(&MoveTarget::from("defer")),
            Err(ModelError::UnknownName { .. })
        ));
        assert!(matches!(
            model.resolve_target(&MoveTarget::from("asdfe")),
            Err(ModelError::UnknownName { .. })
        ));
    }

    #[test]
    fn resolve_target_checks_index_bounds_and_placeholders() {
        let model = int_model();
        assert_eq!(model.resolve_target(&MoveTarget::Index(3)).unwrap().name(), "OUT");
        assert!(matches!(
            model.resolve_target(&MoveTarget::Index(0)),
            Err(ModelError::NotAddressable { .. })
        ));
        assert!(matches!(
            model.resolve_target(&MoveTarget::Index(1)),
            Err(ModelError::NotAddressable { .. })
        ));
        assert!(matches!(
            model.resolve_target(&MoveTarget::Index(4)),
            Err(ModelError::IndexOutOfRange { index: 4, max: 3 })
        ));
        assert!(matches!(
            model.resolve_target(&MoveTarget::Index(-1)),
            Err(ModelError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn states_lists_only_addressable_entries() {
        let names: Vec<String> = int_model().states().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["UNO", "OUT"]);
    }

    #[test]
    fn rejects_duplicate_primary_names() {
        let config = StateModelConfig::record("state", [Some("IN"), Some("IN")]);
        assert!(violations(config).contains(&ConfigViolation::DuplicateState {
            name: "IN".to_string()
        }));
    }

    #[test]
    fn rejects_alias_collision() {
        let config = StateModelConfig::record("state", [Some("IN"), Some("OUT")])
            .with_alias("IN", "X")
            .with_alias("OUT", "X");
        assert!(violations(config)
            .iter()
            .any(|v| matches!(v, ConfigViolation::AliasCollision { alias, .. } if alias == "X")));
    }

    #[test]
    fn rejects_alias_shadowing_another_primary_name() {
        let config = StateModelConfig::record("state", [Some("IN"), Some("OUT")]).with_alias("IN", "OUT");
        assert!(violations(config)
            .iter()
            .any(|v| matches!(v, ConfigViolation::AliasCollision { .. })));
    }

    #[test]
    fn rejects_rules_on_undeclared_signals() {
        let config = StateModelConfig::rules([RuleTier::new(vec![SignalRule::new(
            "ghost",
            [(RawValue::Int(0), "in")],
        )])])
        .with_signals(["lowlim"]);
        assert!(violations(config).contains(&ConfigViolation::UnknownSignal {
            signal: "ghost".to_string()
        }));
    }

    #[test]
    fn rejects_reserved_names_and_unknown_tokens() {
        let config = StateModelConfig::rules([RuleTier::new(vec![SignalRule::new(
            "lowlim",
            [(RawValue::Int(0), "in"), (RawValue::Int(1), "sideways")],
        )])])
        .with_states([Some("in"), Some("defer")]);

        let found = violations(config);
        assert!(found.contains(&ConfigViolation::ReservedName {
            name: "defer".to_string()
        }));
        assert!(found.contains(&ConfigViolation::UnknownToken {
            signal: "lowlim".to_string(),
            token: "sideways".to_string()
        }));
    }

    #[test]
    fn validation_accumulates_every_violation() {
        let config = StateModelConfig::record("state", [Some("A"), Some("A"), Some("Unknown")])
            .with_alias("B", "b")
            .with_signals(["other"]);

        assert_eq!(violations(config).len(), 4);
    }

    #[test]
    fn empty_model_is_rejected() {
        let config = StateModelConfig::rules(Vec::<RuleTier>::new());
        let found = violations(config);
        assert!(found.contains(&ConfigViolation::NoStates));
        assert!(found.contains(&ConfigViolation::EmptyRules));
    }
}
