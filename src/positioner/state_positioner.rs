//! The state positioner: live signals bound to a state model.

use super::action::MoveAction;
use super::error::MoveError;
use super::event::{ReadbackEvent, StateChange};
use super::guard::MoveGuard;
use crate::core::{LogicalState, MoveTarget, RawValues, StateModel};
use crate::signal::{RawValue, Signal, SignalError, SignalSet};
use crate::status::{StateStatus, StatusError};
use crate::subscription::{SubscriberList, SubscriptionId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Per-move settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveOptions {
    /// Fail the status if the target is not reached within this window.
    pub timeout: Option<Duration>,
    /// Extra time [`StateStatus::wait`] lingers after the target is reached.
    pub settle_time: Duration,
}

impl MoveOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }
}

/// Publication state. Reads, the duplicate check and enqueueing all happen
/// under one lock, so the last published state always reflects the latest
/// signal update. Events leave the queue in publish order.
struct Publisher {
    published: LogicalState,
    pending: VecDeque<StateChange>,
    delivering: bool,
}

pub(super) enum Commander {
    Action(Arc<dyn MoveAction>),
    Signal(Arc<dyn Signal>),
    Unsupported,
}

struct Shared {
    name: String,
    model: StateModel,
    signals: SignalSet,
    commander: Commander,
    guards: Vec<MoveGuard>,
    state_subscribers: SubscriberList<StateChange>,
    readback_subscribers: SubscriberList<ReadbackEvent>,
    publisher: Mutex<Publisher>,
    signal_subscriptions: Mutex<Vec<(Arc<dyn Signal>, SubscriptionId)>>,
}

/// Device abstraction binding a [`StateModel`] to live signals.
///
/// The positioner keeps no notion of an intended state: the current state is
/// always recomputed from signal reads. Cloning is cheap and clones share
/// subscribers.
///
/// Duplicate state-change notifications are suppressed: subscribers hear
/// about a state only when it differs from the last one published. Raw
/// readback events are forwarded unfiltered.
#[derive(Clone)]
pub struct StatePositioner {
    shared: Arc<Shared>,
}

impl StatePositioner {
    pub(super) fn assemble(
        name: String,
        model: StateModel,
        signals: SignalSet,
        commander: Commander,
        guards: Vec<MoveGuard>,
    ) -> Self {
        let initial = read_state(&name, &model, &signals);
        let shared = Arc::new(Shared {
            name,
            model,
            signals,
            commander,
            guards,
            state_subscribers: SubscriberList::new(),
            readback_subscribers: SubscriberList::new(),
            publisher: Mutex::new(Publisher {
                published: initial,
                pending: VecDeque::new(),
                delivering: false,
            }),
            signal_subscriptions: Mutex::new(Vec::new()),
        });

        let mut handles = Vec::with_capacity(shared.model.signals().len());
        for signal_name in shared.model.signals() {
            let Ok(signal) = shared.signals.get(signal_name) else {
                continue;
            };
            let weak: Weak<Shared> = Arc::downgrade(&shared);
            let bound_name = signal_name.clone();
            let handle = signal.subscribe(Arc::new(move |value: &RawValue| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_signal_update(&bound_name, value);
                }
            }));
            handles.push((Arc::clone(signal), handle));
        }
        *lock(&shared.signal_subscriptions) = handles;

        debug!(positioner = %shared.name, signals = shared.model.signals().len(), "positioner ready");
        Self { shared }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn model(&self) -> &StateModel {
        &self.shared.model
    }

    pub fn signals(&self) -> &SignalSet {
        &self.shared.signals
    }

    /// Read every signal the model needs.
    pub fn read_raw(&self) -> Result<RawValues, SignalError> {
        read_raw(&self.shared.model, &self.shared.signals)
    }

    /// Derive the current state from fresh signal reads.
    ///
    /// A failed read yields the unknown state.
    pub fn current_state(&self) -> LogicalState {
        read_state(&self.shared.name, &self.shared.model, &self.shared.signals)
    }

    /// Display label of the current state.
    pub fn position(&self) -> String {
        let state = self.current_state();
        self.shared.model.label(&state).to_string()
    }

    /// Move with default options.
    pub fn move_to(&self, target: impl Into<MoveTarget>) -> Result<StateStatus, MoveError> {
        self.move_with(target, MoveOptions::default())
    }

    /// Command a move and return a status tracking it.
    ///
    /// Validation, guard and unsupported-move errors are returned before any
    /// signal is written. Adapter failures after the target was accepted are
    /// reported as a failed status. The call never blocks on hardware.
    pub fn move_with(
        &self,
        target: impl Into<MoveTarget>,
        options: MoveOptions,
    ) -> Result<StateStatus, MoveError> {
        let target = target.into();
        let state = self.shared.model.resolve_target(&target)?;

        for guard in &self.shared.guards {
            if let Err(reason) = guard.check(&state) {
                warn!(positioner = %self.shared.name, target = %state, guard = guard.name(), %reason, "move refused");
                return Err(MoveError::Permission {
                    positioner: self.shared.name.clone(),
                    target: state.name().to_string(),
                    reason,
                });
            }
        }

        info!(positioner = %self.shared.name, requested = %target, target = %state, "moving");
        let written = match &self.shared.commander {
            Commander::Action(action) => action.command(&state, &self.shared.signals),
            Commander::Signal(signal) => signal.put(RawValue::from(state.index())),
            Commander::Unsupported => {
                return Err(MoveError::Unsupported {
                    positioner: self.shared.name.clone(),
                })
            }
        };

        match written {
            Ok(()) => Ok(StateStatus::new(self, state, options)),
            Err(SignalError::PermissionDenied { signal, reason }) => Err(MoveError::Permission {
                positioner: self.shared.name.clone(),
                target: state.name().to_string(),
                reason: format!("{signal}: {reason}"),
            }),
            Err(err @ (SignalError::ReadOnly { .. } | SignalError::Missing { .. })) => {
                Err(MoveError::Signal(err))
            }
            Err(err) => {
                warn!(positioner = %self.shared.name, target = %state, error = %err, "move rejected by adapter");
                let failure = StatusError::Adapter {
                    target: state.name().to_string(),
                    reason: err.to_string(),
                };
                Ok(StateStatus::failed(self, state, options, failure))
            }
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.shared.state_subscribers.add(Arc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.state_subscribers.remove(id)
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.shared.state_subscribers.contains(id)
    }

    /// Number of live state-change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state_subscribers.len()
    }

    /// Subscribe to raw per-signal updates.
    pub fn subscribe_readback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ReadbackEvent) + Send + Sync + 'static,
    {
        self.shared.readback_subscribers.add(Arc::new(callback))
    }

    pub fn unsubscribe_readback(&self, id: SubscriptionId) -> bool {
        self.shared.readback_subscribers.remove(id)
    }
}

impl std::fmt::Debug for StatePositioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePositioner")
            .field("name", &self.shared.name)
            .field("signals", &self.shared.signals)
            .field("guards", &self.shared.guards)
            .finish()
    }
}

impl Shared {
    fn on_signal_update(&self, signal: &str, value: &RawValue) {
        self.readback_subscribers.notify(&ReadbackEvent {
            signal: signal.to_string(),
            value: value.clone(),
            timestamp: Utc::now(),
        });

        {
            let mut publisher = lock(&self.publisher);
            let current = read_state(&self.name, &self.model, &self.signals);
            if publisher.published == current {
                trace!(positioner = %self.name, %signal, state = %current, "state unchanged");
                return;
            }
            let previous = std::mem::replace(&mut publisher.published, current.clone());
            debug!(
                positioner = %self.name,
                %signal,
                from = %previous,
                to = %current,
                "state changed"
            );
            publisher.pending.push_back(StateChange {
                previous,
                current,
                timestamp: Utc::now(),
            });
            if publisher.delivering {
                return;
            }
            publisher.delivering = true;
        }
        self.deliver();
    }

    /// Drain queued changes to subscribers, one at a time and without holding
    /// the lock. Changes queued meanwhile, from any thread or from a
    /// subscriber itself, are delivered by this loop.
    fn deliver(&self) {
        let _guard = DeliveryGuard(self);
        loop {
            let change = {
                let mut publisher = lock(&self.publisher);
                match publisher.pending.pop_front() {
                    Some(change) => change,
                    None => {
                        publisher.delivering = false;
                        return;
                    }
                }
            };
            self.state_subscribers.notify(&change);
        }
    }
}

/// Hands delivery back if a subscriber panics mid-loop.
struct DeliveryGuard<'a>(&'a Shared);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(&self.0.publisher).delivering = false;
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let handles = self
            .signal_subscriptions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (signal, handle) in handles.drain(..) {
            signal.unsubscribe(handle);
        }
    }
}

fn read_raw(model: &StateModel, signals: &SignalSet) -> Result<RawValues, SignalError> {
    let mut raw = RawValues::new();
    for name in model.signals() {
        raw.insert(name.clone(), signals.get(name)?.get()?);
    }
    Ok(raw)
}

fn read_state(positioner: &str, model: &StateModel, signals: &SignalSet) -> LogicalState {
    match read_raw(model, signals) {
        Ok(raw) => model.resolve(&raw),
        Err(err) => {
            warn!(%positioner, error = %err, "signal read failed, state is unknown");
            model.unknown()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
