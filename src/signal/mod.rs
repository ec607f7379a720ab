//! The signal capability the engine is written against.
//!
//! A signal is an observable hardware value: it can be read, optionally
//! written, and subscribed to. How the value travels over a control-system
//! wire is the adapter's business. The engine only needs the [`Signal`]
//! trait.
//!
//! [`MemorySignal`] is an in-process implementation used for simulation and
//! tests.

mod error;
mod memory;
mod value;

pub use error::SignalError;
pub use memory::MemorySignal;
pub use value::RawValue;

use crate::subscription::{Callback, SubscriptionId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Callback invoked with every new value of a signal.
pub type SignalCallback = Callback<RawValue>;

/// Readable, optionally writable, observable hardware value.
///
/// Callbacks may be invoked on whatever thread the adapter delivers updates
/// on. Implementations must not hold internal locks while invoking them.
pub trait Signal: Send + Sync {
    /// Name the signal is bound under.
    fn name(&self) -> &str;

    /// Read the current value. Reads must not invoke subscriber callbacks.
    fn get(&self) -> Result<RawValue, SignalError>;

    /// Write a new value. Read-only signals keep the default.
    fn put(&self, _value: RawValue) -> Result<(), SignalError> {
        Err(SignalError::ReadOnly {
            signal: self.name().to_string(),
        })
    }

    /// Register a callback for value updates.
    fn subscribe(&self, callback: SignalCallback) -> SubscriptionId;

    /// Remove a callback. Returns `false` if the handle was unknown.
    fn unsubscribe(&self, handle: SubscriptionId) -> bool;
}

/// Signals bound to a device, keyed by the names a state model uses.
#[derive(Clone, Default)]
pub struct SignalSet {
    signals: BTreeMap<String, Arc<dyn Signal>>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, signal: Arc<dyn Signal>) {
        self.signals.insert(name.into(), signal);
    }

    /// Look up a bound signal.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Signal>, SignalError> {
        self.signals.get(name).ok_or_else(|| SignalError::Missing {
            signal: name.to_string(),
        })
    }

    /// Write `value` to the signal bound under `name`.
    pub fn put(&self, name: &str, value: impl Into<RawValue>) -> Result<(), SignalError> {
        self.get(name)?.put(value.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Signal>)> {
        self.signals.iter().map(|(name, signal)| (name.as_str(), signal))
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl std::fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.signals.keys()).finish()
    }
}
