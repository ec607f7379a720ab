//! Retractable offset mirror.
//!
//! A pointing mirror can be driven fully out of the beam. Its in/out state is
//! a regular state positioner; the horizontal gantry it rides on must be
//! coupled before any state move is honoured. The mirror holds both as
//! fields and forwards to them.

use crate::core::{LogicalState, MoveTarget};
use crate::positioner::{BuildError, MoveError, MoveGuard, MoveOptions, PositionerBuilder, StatePositioner};
use crate::signal::{Signal, SignalError};
use crate::status::StateStatus;
use std::sync::Arc;

/// A pair of coupled stepper motors reported through a `decoupled` flag.
#[derive(Clone)]
pub struct Gantry {
    name: String,
    decoupled: Arc<dyn Signal>,
}

impl Gantry {
    pub fn new(name: impl Into<String>, decoupled: Arc<dyn Signal>) -> Self {
        Self {
            name: name.into(),
            decoupled,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_coupled(&self) -> Result<bool, SignalError> {
        Ok(!self.decoupled.get()?.is_truthy())
    }

    /// Guard refusing every move while the gantry is decoupled or its
    /// coupling cannot be read.
    pub fn coupling_guard(&self) -> MoveGuard {
        let gantry = self.clone();
        MoveGuard::new(format!("{} coupling", self.name), move |_target: &LogicalState| {
            match gantry.is_coupled() {
                Ok(true) => Ok(()),
                Ok(false) => Err(format!("the {} gantry is uncoupled", gantry.name)),
                Err(err) => Err(format!("cannot confirm {} gantry coupling: {err}", gantry.name)),
            }
        })
    }
}

impl std::fmt::Debug for Gantry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gantry")
            .field("name", &self.name)
            .field("decoupled", &self.decoupled.name())
            .finish()
    }
}

/// Offset mirror that can be inserted into or removed from the beam.
#[derive(Debug, Clone)]
pub struct PointingMirror {
    name: String,
    state: StatePositioner,
    xgantry: Gantry,
    in_states: Vec<String>,
    out_states: Vec<String>,
}

impl PointingMirror {
    /// Build the mirror's state positioner with the gantry coupling check
    /// layered on top of whatever `state` already carries.
    pub fn new(
        name: impl Into<String>,
        state: PositionerBuilder,
        xgantry: Gantry,
    ) -> Result<Self, BuildError> {
        let state = state.guard(xgantry.coupling_guard()).build()?;
        Ok(Self {
            name: name.into(),
            state,
            xgantry,
            in_states: vec!["IN".to_string()],
            out_states: vec!["OUT".to_string()],
        })
    }

    /// Names (or aliases) that count as inserted and removed.
    pub fn with_in_out_states<I, O>(mut self, in_states: I, out_states: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        self.in_states = in_states.into_iter().map(Into::into).collect();
        self.out_states = out_states.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &StatePositioner {
        &self.state
    }

    pub fn xgantry(&self) -> &Gantry {
        &self.xgantry
    }

    pub fn position(&self) -> String {
        self.state.position()
    }

    pub fn move_to(&self, target: impl Into<MoveTarget>) -> Result<StateStatus, MoveError> {
        self.state.move_to(target)
    }

    pub fn move_with(
        &self,
        target: impl Into<MoveTarget>,
        options: MoveOptions,
    ) -> Result<StateStatus, MoveError> {
        self.state.move_with(target, options)
    }

    pub fn inserted(&self) -> bool {
        self.is_in(&self.in_states)
    }

    pub fn removed(&self) -> bool {
        self.is_in(&self.out_states)
    }

    fn is_in(&self, names: &[String]) -> bool {
        let current = self.state.current_state();
        if current.is_unknown() {
            return false;
        }
        let model = self.state.model();
        names
            .iter()
            .any(|name| model.name_to_index(name).is_ok_and(|index| index == current.index()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateModelConfig;
    use crate::signal::MemorySignal;

    struct Rig {
        mirror: PointingMirror,
        state: Arc<MemorySignal>,
        decoupled: Arc<MemorySignal>,
    }

    fn rig(state_value: i64) -> Rig {
        let state = Arc::new(MemorySignal::new("MIRR:XRT:M1H:STATE", state_value));
        let decoupled = Arc::new(MemorySignal::read_only("GANTRY:XRT:M1H:X:DECOUPLE", false));
        let builder = PositionerBuilder::new("m1h_state")
            .config(StateModelConfig::record("state", [Some("IN"), Some("OUT")]))
            .signal("state", state.clone());
        let mirror = PointingMirror::new("m1h", builder, Gantry::new("X", decoupled.clone())).unwrap();
        Rig {
            mirror,
            state,
            decoupled,
        }
    }

    #[test]
    fn inserted_and_removed_follow_state() {
        let rig = rig(1);
        assert!(rig.mirror.inserted());
        assert!(!rig.mirror.removed());

        rig.state.set(2);
        assert!(rig.mirror.removed());
        assert!(!rig.mirror.inserted());

        rig.state.set(0);
        assert!(!rig.mirror.inserted());
        assert!(!rig.mirror.removed());
    }

    #[test]
    fn coupled_gantry_allows_moves() {
        let rig = rig(1);
        let status = rig.mirror.move_to("OUT").unwrap();

        assert!(status.success());
        assert_eq!(rig.mirror.position(), "OUT");
        assert_eq!(rig.state.write_count(), 1);
    }

    #[test]
    fn decoupled_gantry_refuses_moves_without_writing() {
        let rig = rig(1);
        rig.decoupled.set(true);

        let result = rig.mirror.move_to("OUT");

        assert!(matches!(result, Err(MoveError::Permission { .. })));
        assert_eq!(rig.state.write_count(), 0);
        assert_eq!(rig.mirror.position(), "IN");
        assert!(!rig.mirror.xgantry().is_coupled().unwrap());
    }

    #[test]
    fn unreadable_coupling_refuses_moves() {
        let rig = rig(1);
        rig.decoupled.disconnect();

        assert!(rig.mirror.move_to(2i64).unwrap_err().is_permission());
    }

    #[test]
    fn custom_in_out_names_are_alias_aware() {
        let state = Arc::new(MemorySignal::new("state", 1));
        let decoupled = Arc::new(MemorySignal::read_only("decouple", 0));
        let builder = PositionerBuilder::new("m2h_state")
            .config(
                StateModelConfig::record("state", [Some("INSERTED"), Some("RETRACTED")])
                    .with_alias("INSERTED", "in"),
            )
            .signal("state", state);
        let mirror = PointingMirror::new("m2h", builder, Gantry::new("X", decoupled))
            .unwrap()
            .with_in_out_states(["in"], ["RETRACTED"]);

        assert!(mirror.inserted());
    }
}
