//! In-process signal implementation.

use super::{RawValue, Signal, SignalCallback, SignalError};
use crate::subscription::{SubscriberList, SubscriptionId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Clone, Debug, PartialEq)]
enum Availability {
    Connected,
    Disconnected,
    RejectingWrites(String),
    Interlocked(String),
}

/// A signal whose value lives in memory.
///
/// [`Signal::put`] honours the writability and availability settings and
/// counts accepted writes. [`MemorySignal::set`] plays the role of the
/// hardware: it always updates the value and notifies subscribers, and is
/// never counted as a write.
///
/// Every update notifies subscribers, even when the value is unchanged.
#[derive(Debug)]
pub struct MemorySignal {
    name: String,
    writable: bool,
    value: Mutex<RawValue>,
    availability: Mutex<Availability>,
    subscribers: SubscriberList<RawValue>,
    writes: AtomicUsize,
}

impl MemorySignal {
    /// Writable signal with an initial value.
    pub fn new(name: impl Into<String>, initial: impl Into<RawValue>) -> Self {
        Self {
            name: name.into(),
            writable: true,
            value: Mutex::new(initial.into()),
            availability: Mutex::new(Availability::Connected),
            subscribers: SubscriberList::new(),
            writes: AtomicUsize::new(0),
        }
    }

    /// Read-only signal with an initial value.
    pub fn read_only(name: impl Into<String>, initial: impl Into<RawValue>) -> Self {
        Self {
            writable: false,
            ..Self::new(name, initial)
        }
    }

    /// Simulate a hardware-side update.
    pub fn set(&self, value: impl Into<RawValue>) {
        self.store(value.into());
    }

    /// Number of writes accepted through [`Signal::put`].
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Make reads fail until [`MemorySignal::reconnect`] is called.
    pub fn disconnect(&self) {
        *lock(&self.availability) = Availability::Disconnected;
    }

    pub fn reconnect(&self) {
        *lock(&self.availability) = Availability::Connected;
    }

    /// Refuse writes with [`SignalError::Rejected`].
    pub fn reject_writes(&self, reason: impl Into<String>) {
        *lock(&self.availability) = Availability::RejectingWrites(reason.into());
    }

    /// Refuse writes with [`SignalError::PermissionDenied`].
    pub fn interlock(&self, reason: impl Into<String>) {
        *lock(&self.availability) = Availability::Interlocked(reason.into());
    }

    fn store(&self, value: RawValue) {
        trace!(signal = %self.name, %value, "signal update");
        *lock(&self.value) = value.clone();
        self.subscribers.notify(&value);
    }
}

impl Signal for MemorySignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> Result<RawValue, SignalError> {
        if *lock(&self.availability) == Availability::Disconnected {
            return Err(SignalError::Disconnected {
                signal: self.name.clone(),
            });
        }
        Ok(lock(&self.value).clone())
    }

    fn put(&self, value: RawValue) -> Result<(), SignalError> {
        if !self.writable {
            return Err(SignalError::ReadOnly {
                signal: self.name.clone(),
            });
        }
        let availability = lock(&self.availability).clone();
        match availability {
            Availability::Connected => {}
            Availability::Disconnected => {
                return Err(SignalError::Disconnected {
                    signal: self.name.clone(),
                })
            }
            Availability::RejectingWrites(reason) => {
                return Err(SignalError::Rejected {
                    signal: self.name.clone(),
                    reason,
                })
            }
            Availability::Interlocked(reason) => {
                return Err(SignalError::PermissionDenied {
                    signal: self.name.clone(),
                    reason,
                })
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.store(value);
        Ok(())
    }

    fn subscribe(&self, callback: SignalCallback) -> SubscriptionId {
        self.subscribers.add(callback)
    }

    fn unsubscribe(&self, handle: SubscriptionId) -> bool {
        self.subscribers.remove(handle)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn put_updates_value_and_counts_writes() {
        let signal = MemorySignal::new("lowlim", 0);
        signal.put(RawValue::Int(1)).unwrap();

        assert_eq!(signal.get().unwrap(), RawValue::Int(1));
        assert_eq!(signal.write_count(), 1);
    }

    #[test]
    fn set_is_not_counted_as_a_write() {
        let signal = MemorySignal::read_only("decoupled", false);
        signal.set(true);

        assert_eq!(signal.get().unwrap(), RawValue::Bool(true));
        assert_eq!(signal.write_count(), 0);
    }

    #[test]
    fn read_only_signal_refuses_put() {
        let signal = MemorySignal::read_only("rbv", 1.5);
        let result = signal.put(RawValue::Float(2.0));

        assert!(matches!(result, Err(SignalError::ReadOnly { .. })));
        assert_eq!(signal.get().unwrap(), RawValue::Float(1.5));
    }

    #[test]
    fn every_update_notifies_even_when_unchanged() {
        let signal = MemorySignal::new("state", 1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        signal.subscribe(Arc::new(move |value: &RawValue| {
            sink.lock().unwrap().push(value.clone());
        }));

        signal.set(1);
        signal.set(1);
        signal.put(RawValue::Int(2)).unwrap();

        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let signal = MemorySignal::new("state", 1);
        let handle = signal.subscribe(Arc::new(|_: &RawValue| {}));

        assert_eq!(signal.subscriber_count(), 1);
        assert!(signal.unsubscribe(handle));
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn availability_modes_map_to_errors() {
        let signal = MemorySignal::new("cmd", 0);

        signal.disconnect();
        assert!(matches!(signal.get(), Err(SignalError::Disconnected { .. })));
        signal.reconnect();

        signal.reject_writes("motor disabled");
        assert!(matches!(
            signal.put(RawValue::Int(1)),
            Err(SignalError::Rejected { .. })
        ));

        signal.interlock("interlock tripped");
        assert!(matches!(
            signal.put(RawValue::Int(1)),
            Err(SignalError::PermissionDenied { .. })
        ));
        assert_eq!(signal.write_count(), 0);
    }
}
