//! Typed subscriber lists with handle-based removal.
//!
//! Every observable in the crate (signals, positioner state changes,
//! readback events) owns a [`SubscriberList`]. Adding a callback returns a
//! [`SubscriptionId`]; removing it by id is the only way a callback leaves the
//! list, so leaks are checkable with [`SubscriberList::contains`].
//!
//! Notification iterates over a snapshot taken under the lock and then runs
//! the callbacks with the lock released. Callbacks may therefore add or remove
//! subscriptions (including their own) while a fan-out is in flight.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle identifying one registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Shared callback invoked with a borrowed event.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of callbacks for events of type `E`.
pub struct SubscriberList<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> SubscriberList<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback. Callbacks are notified in registration order.
    pub fn add(&self, callback: Callback<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, callback));
        id
    }

    /// Remove a callback. Returns `false` if the id was not registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.lock().iter().any(|(existing, _)| *existing == id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver `event` to every callback registered when the call began.
    ///
    /// A callback removed by an earlier callback in the same fan-out is
    /// skipped.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<(SubscriptionId, Callback<E>)> = self.lock().clone();
        for (id, callback) in snapshot {
            if self.contains(id) {
                callback(event);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Callback<E>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for SubscriberList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for SubscriberList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<SubscriptionId> = self.lock().iter().map(|(id, _)| *id).collect();
        f.debug_struct("SubscriberList").field("ids", &ids).finish()
    }
}
