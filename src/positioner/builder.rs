//! Builder for constructing state positioners.

use super::action::MoveAction;
use super::error::BuildError;
use super::guard::MoveGuard;
use super::state_positioner::{Commander, StatePositioner};
use crate::core::{LogicalState, StateModel, StateModelConfig};
use crate::signal::{Signal, SignalSet};
use std::sync::Arc;

enum ModelSource {
    Model(StateModel),
    Config(StateModelConfig),
}

/// Builder for [`StatePositioner`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use statekeeper::core::StateModelConfig;
/// use statekeeper::positioner::PositionerBuilder;
/// use statekeeper::signal::MemorySignal;
/// use std::sync::Arc;
///
/// let state = Arc::new(MemorySignal::new("state", 2));
/// let positioner = PositionerBuilder::new("int")
///     .config(
///         StateModelConfig::record("state", [None, Some("UNO"), Some("OUT")])
///             .with_alias("UNO", vec!["IN", "in"]),
///     )
///     .signal("state", state)
///     .build()
///     .unwrap();
///
/// assert_eq!(positioner.position(), "IN");
/// ```
pub struct PositionerBuilder {
    name: String,
    model: Option<ModelSource>,
    signals: SignalSet,
    command: Option<Arc<dyn Signal>>,
    action: Option<Arc<dyn MoveAction>>,
    guards: Vec<MoveGuard>,
}

impl PositionerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            signals: SignalSet::new(),
            command: None,
            action: None,
            guards: Vec::new(),
        }
    }

    /// Use an already validated model.
    pub fn model(mut self, model: StateModel) -> Self {
        self.model = Some(ModelSource::Model(model));
        self
    }

    /// Use a configuration, validated at [`build`](Self::build).
    pub fn config(mut self, config: StateModelConfig) -> Self {
        self.model = Some(ModelSource::Config(config));
        self
    }

    /// Bind a signal under the name the model refers to it by.
    ///
    /// Signals the model does not read may be bound too; move actions can
    /// reach them through the [`SignalSet`].
    pub fn signal(mut self, name: impl Into<String>, signal: Arc<dyn Signal>) -> Self {
        self.signals.insert(name, signal);
        self
    }

    /// Signal that receives the target index on a default move.
    ///
    /// Record-derived models default to their state signal.
    pub fn command_signal(mut self, signal: Arc<dyn Signal>) -> Self {
        self.command = Some(signal);
        self
    }

    /// Replace the default command path.
    pub fn move_action<A>(mut self, action: A) -> Self
    where
        A: MoveAction + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Add a pre-move check.
    pub fn guard(mut self, guard: MoveGuard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Add a pre-move check from a closure.
    pub fn check<F>(self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&LogicalState) -> Result<(), String> + Send + Sync + 'static,
    {
        self.guard(MoveGuard::new(name, check))
    }

    /// Build the positioner.
    /// Returns an error if the model is missing or invalid, or a signal it
    /// reads is not bound.
    pub fn build(self) -> Result<StatePositioner, BuildError> {
        let model = match self.model.ok_or(BuildError::MissingModel)? {
            ModelSource::Model(model) => model,
            ModelSource::Config(config) => StateModel::new(config)?,
        };

        if let Some(missing) = model.signals().iter().find(|name| !self.signals.contains(name)) {
            return Err(BuildError::MissingSignal {
                signal: missing.clone(),
            });
        }

        let record = model
            .record_signal()
            .and_then(|name| self.signals.get(name).ok())
            .cloned();
        let commander = match (self.action, self.command.or(record)) {
            (Some(action), _) => Commander::Action(action),
            (None, Some(signal)) => Commander::Signal(signal),
            (None, None) => Commander::Unsupported,
        };

        Ok(StatePositioner::assemble(
            self.name,
            model,
            self.signals,
            commander,
            self.guards,
        ))
    }
}
