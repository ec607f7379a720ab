//! One-shot status for a commanded state transition.

use super::outcome::{Outcome, StatusError};
use crate::core::{LogicalState, ModelError, MoveTarget};
use crate::positioner::{MoveOptions, StateChange, StatePositioner};
use crate::subscription::SubscriptionId;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace};
use uuid::Uuid;

type SettleCallback = Box<dyn FnOnce(&Outcome) + Send>;

#[derive(Default)]
struct Progress {
    outcome: Option<Outcome>,
    subscription: Option<SubscriptionId>,
    ever_subscribed: bool,
    callbacks: Vec<SettleCallback>,
    /// Holds the status alive while callbacks wait on it.
    keepalive: Option<Arc<StatusInner>>,
}

struct StatusInner {
    id: Uuid,
    positioner: StatePositioner,
    target: LogicalState,
    options: MoveOptions,
    started_at: DateTime<Utc>,
    deadline: Option<Instant>,
    progress: Mutex<Progress>,
    settled: watch::Sender<Option<Outcome>>,
}

/// Tracks one move until the positioner reports the target state.
///
/// State changes to anything other than the target (intermediate states,
/// unknown) leave the status pending. Only reaching the target, the timeout,
/// [`cancel`](Self::cancel) or an adapter rejection settle it.
///
/// The engine runs no timers. An elapsed timeout is noticed on the next state
/// notification, on any query ([`outcome`](Self::outcome),
/// [`done`](Self::done), [`check_timeout`](Self::check_timeout)) or while
/// awaiting [`wait`](Self::wait).
///
/// Clones share the same underlying status.
#[derive(Clone)]
pub struct StateStatus {
    inner: Arc<StatusInner>,
}

impl StateStatus {
    /// Track `target` on `positioner`.
    ///
    /// If the positioner is already at the target the status settles
    /// immediately and never subscribes.
    pub fn new(positioner: &StatePositioner, target: LogicalState, options: MoveOptions) -> Self {
        let status = Self::unsubscribed(positioner, target, options);
        if positioner.current_state() == status.inner.target {
            status.settle(Outcome::Success);
            return status;
        }

        let weak = Arc::downgrade(&status.inner);
        let id = positioner.subscribe(move |change: &StateChange| {
            if let Some(inner) = weak.upgrade() {
                StateStatus { inner }.on_state_change(change);
            }
        });
        let already_settled = {
            let mut progress = status.lock();
            progress.ever_subscribed = true;
            if progress.outcome.is_some() {
                true
            } else {
                progress.subscription = Some(id);
                false
            }
        };
        if already_settled {
            positioner.unsubscribe(id);
        }
        trace!(status = %status.inner.id, target = %status.inner.target, subscription = %id, "status subscribed");

        // The state may have changed between the first read and subscribing.
        if positioner.current_state() == status.inner.target {
            status.settle(Outcome::Success);
        }
        status
    }

    /// Resolve `target` through the positioner's model, then track it.
    pub fn for_target(
        positioner: &StatePositioner,
        target: impl Into<MoveTarget>,
        options: MoveOptions,
    ) -> Result<Self, ModelError> {
        let target = positioner.model().resolve_target(&target.into())?;
        Ok(Self::new(positioner, target, options))
    }

    /// A status that is already settled as failed.
    pub(crate) fn failed(
        positioner: &StatePositioner,
        target: LogicalState,
        options: MoveOptions,
        error: StatusError,
    ) -> Self {
        let status = Self::unsubscribed(positioner, target, options);
        status.settle(Outcome::Failed(error));
        status
    }

    fn unsubscribed(positioner: &StatePositioner, target: LogicalState, options: MoveOptions) -> Self {
        let (settled, _) = watch::channel(None);
        Self {
            inner: Arc::new(StatusInner {
                id: Uuid::new_v4(),
                positioner: positioner.clone(),
                target,
                options,
                started_at: Utc::now(),
                deadline: options.timeout.map(|timeout| Instant::now() + timeout),
                progress: Mutex::new(Progress::default()),
                settled,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn target(&self) -> &LogicalState {
        &self.inner.target
    }

    pub fn options(&self) -> MoveOptions {
        self.inner.options
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Time since the status was created.
    pub fn elapsed(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.inner.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// The settled outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Outcome> {
        self.check_timeout();
        self.lock().outcome.clone()
    }

    pub fn done(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn success(&self) -> bool {
        self.outcome().is_some_and(|outcome| outcome.is_success())
    }

    /// Whether the status currently holds a positioner subscription.
    pub fn is_subscribed(&self) -> bool {
        self.lock().subscription.is_some()
    }

    /// Whether the status ever subscribed to the positioner.
    pub fn was_subscribed(&self) -> bool {
        self.lock().ever_subscribed
    }

    /// The live subscription handle, if any.
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.lock().subscription
    }

    /// Settle as cancelled. Returns `false` if already settled.
    pub fn cancel(&self) -> bool {
        self.settle(Outcome::Failed(StatusError::Cancelled {
            target: self.inner.target.name().to_string(),
        }))
    }

    /// Settle as timed out if the deadline has passed. Returns `true` if this
    /// call settled the status.
    pub fn check_timeout(&self) -> bool {
        let (Some(deadline), Some(timeout)) = (self.inner.deadline, self.inner.options.timeout) else {
            return false;
        };
        if Instant::now() < deadline {
            return false;
        }
        self.settle(Outcome::Failed(StatusError::Timeout {
            target: self.inner.target.name().to_string(),
            timeout,
        }))
    }

    /// Run `callback` once when the status settles, or right away if it
    /// already has.
    ///
    /// A pending status with callbacks stays alive after every handle is
    /// dropped, until it settles. Timeouts are only noticed on the next state
    /// notification or query, so a callback on a silent positioner fires no
    /// earlier than that; [`wait`](Self::wait) or
    /// [`check_timeout`](Self::check_timeout) force the check.
    pub fn add_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let outcome = {
            let mut progress = self.lock();
            match progress.outcome.clone() {
                Some(outcome) => outcome,
                None => {
                    progress.callbacks.push(Box::new(callback));
                    if progress.keepalive.is_none() {
                        progress.keepalive = Some(Arc::clone(&self.inner));
                    }
                    return;
                }
            }
        };
        callback(&outcome);
    }

    /// Wait for the status to settle.
    ///
    /// Honours the timeout while waiting. After a success the call lingers
    /// for the configured settle time before returning.
    pub async fn wait(&self) -> Result<(), StatusError> {
        let mut receiver = self.inner.settled.subscribe();
        let settled = receiver.wait_for(Option::is_some);
        match self.inner.deadline {
            Some(deadline) => {
                if tokio::time::timeout_at(deadline.into(), settled).await.is_err() {
                    self.check_timeout();
                }
            }
            None => {
                let _ = settled.await;
            }
        }

        let outcome = self.outcome().unwrap_or_else(|| {
            Outcome::Failed(StatusError::Cancelled {
                target: self.inner.target.name().to_string(),
            })
        });
        if outcome.is_success() && !self.inner.options.settle_time.is_zero() {
            tokio::time::sleep(self.inner.options.settle_time).await;
        }
        outcome.into_result()
    }

    fn on_state_change(&self, change: &StateChange) {
        if self.check_timeout() {
            return;
        }
        if change.current == self.inner.target {
            self.settle(Outcome::Success);
        } else {
            trace!(status = %self.inner.id, target = %self.inner.target, state = %change.current, "still pending");
        }
    }

    /// Record the outcome, release the subscription and fire callbacks.
    /// Only the first call has any effect.
    fn settle(&self, outcome: Outcome) -> bool {
        let (callbacks, subscription, _keepalive) = {
            let mut progress = self.lock();
            if progress.outcome.is_some() {
                trace!(status = %self.inner.id, ignored = ?outcome, "status already settled");
                return false;
            }
            progress.outcome = Some(outcome.clone());
            (
                std::mem::take(&mut progress.callbacks),
                progress.subscription.take(),
                progress.keepalive.take(),
            )
        };

        if let Some(id) = subscription {
            self.inner.positioner.unsubscribe(id);
        }
        debug!(
            status = %self.inner.id,
            positioner = self.inner.positioner.name(),
            target = %self.inner.target,
            outcome = ?outcome,
            elapsed_ms = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
            "status settled"
        );
        self.inner.settled.send_replace(Some(outcome.clone()));
        for callback in callbacks {
            callback(&outcome);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.inner.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for StateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let progress = self.lock();
        f.debug_struct("StateStatus")
            .field("id", &self.inner.id)
            .field("target", &self.inner.target)
            .field("outcome", &progress.outcome)
            .field("subscription", &progress.subscription)
            .finish()
    }
}

impl Drop for StatusInner {
    fn drop(&mut self) {
        let progress = self.progress.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = progress.subscription.take() {
            self.positioner.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateModelConfig;
    use crate::positioner::PositionerBuilder;
    use crate::signal::MemorySignal;

    fn record_positioner(initial: i64) -> (StatePositioner, Arc<MemorySignal>) {
        let state = Arc::new(MemorySignal::new("state", initial));
        let positioner = PositionerBuilder::new("stage")
            .config(StateModelConfig::record(
                "state",
                [Some("IN"), Some("MID"), Some("OUT")],
            ))
            .signal("state", state.clone())
            .build()
            .unwrap();
        (positioner, state)
    }

    fn track(positioner: &StatePositioner, target: &str, options: MoveOptions) -> StateStatus {
        StateStatus::for_target(positioner, target, options).unwrap()
    }

    #[test]
    fn status_at_target_settles_without_subscribing() {
        let (positioner, _state) = record_positioner(3);
        let status = track(&positioner, "OUT", MoveOptions::default());

        assert!(status.success());
        assert!(!status.was_subscribed());
        assert_eq!(positioner.subscriber_count(), 0);
    }

    #[test]
    fn status_settles_on_first_matching_notification() {
        let (positioner, state) = record_positioner(0);
        let status = track(&positioner, "OUT", MoveOptions::default());
        assert!(status.is_subscribed());
        assert_eq!(positioner.subscriber_count(), 1);

        for value in [1, 2, 0, 2] {
            state.set(value);
            assert!(!status.done());
        }
        state.set(3);

        assert!(status.success());
        assert!(!status.is_subscribed());
        assert!(status.was_subscribed());
        assert_eq!(positioner.subscriber_count(), 0);

        state.set(1);
        assert!(status.success());
    }

    #[test]
    fn cancel_settles_once_and_fires_callbacks_once() {
        let (positioner, state) = record_positioner(0);
        let status = track(&positioner, "IN", MoveOptions::default());
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        status.add_callback(move |outcome: &Outcome| sink.lock().unwrap().push(outcome.clone()));

        assert!(status.cancel());
        assert!(!status.cancel());
        state.set(1);

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert!(matches!(
            fired[0],
            Outcome::Failed(StatusError::Cancelled { .. })
        ));
        assert!(!status.success());
        assert_eq!(positioner.subscriber_count(), 0);
    }

    #[test]
    fn callback_added_after_settlement_runs_immediately() {
        let (positioner, _state) = record_positioner(1);
        let status = track(&positioner, "IN", MoveOptions::default());
        let fired = Arc::new(Mutex::new(false));
        let sink = Arc::clone(&fired);

        status.add_callback(move |outcome: &Outcome| *sink.lock().unwrap() = outcome.is_success());

        assert!(*fired.lock().unwrap());
    }

    #[test]
    fn elapsed_timeout_is_noticed_on_query() {
        let (positioner, _state) = record_positioner(0);
        let status = track(
            &positioner,
            "MID",
            MoveOptions::default().timeout(Duration::ZERO),
        );

        assert!(matches!(
            status.outcome(),
            Some(Outcome::Failed(StatusError::Timeout { .. }))
        ));
        assert!(!status.is_subscribed());
        assert_eq!(positioner.subscriber_count(), 0);
    }

    #[test]
    fn late_arrival_after_timeout_does_not_flip_outcome() {
        let (positioner, state) = record_positioner(0);
        let status = track(
            &positioner,
            "MID",
            MoveOptions::default().timeout(Duration::from_millis(5)),
        );
        std::thread::sleep(Duration::from_millis(20));
        state.set(2);

        assert!(matches!(
            status.outcome(),
            Some(Outcome::Failed(StatusError::Timeout { .. }))
        ));
    }

    #[test]
    fn dropping_pending_status_releases_subscription() {
        let (positioner, _state) = record_positioner(0);
        let status = track(&positioner, "OUT", MoveOptions::default());
        let clone = status.clone();
        assert_eq!(positioner.subscriber_count(), 1);

        drop(status);
        assert_eq!(positioner.subscriber_count(), 1);
        drop(clone);
        assert_eq!(positioner.subscriber_count(), 0);
    }

    #[test]
    fn dropped_status_with_callback_still_settles() {
        let (positioner, state) = record_positioner(0);
        let status = track(&positioner, "OUT", MoveOptions::default());
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        status.add_callback(move |outcome: &Outcome| sink.lock().unwrap().push(outcome.clone()));

        drop(status);
        assert_eq!(positioner.subscriber_count(), 1);
        state.set(3);

        assert_eq!(*fired.lock().unwrap(), vec![Outcome::Success]);
        assert_eq!(positioner.subscriber_count(), 0);
    }

    #[test]
    fn unknown_target_is_a_model_error() {
        let (positioner, _state) = record_positioner(0);
        let result = StateStatus::for_target(&positioner, "SIDEWAYS", MoveOptions::default());
        assert!(matches!(result, Err(ModelError::UnknownName { .. })));
    }

    #[tokio::test]
    async fn wait_returns_when_target_is_reached() {
        let (positioner, state) = record_positioner(0);
        let status = track(
            &positioner,
            "OUT",
            MoveOptions::default().timeout(Duration::from_secs(5)),
        );

        let mover = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            state.set(3);
        });

        assert!(status.wait().await.is_ok());
        mover.await.unwrap();
    }

    #[tokio::test]
    async fn wait_reports_timeout() {
        let (positioner, _state) = record_positioner(0);
        let status = track(
            &positioner,
            "OUT",
            MoveOptions::default().timeout(Duration::from_millis(10)),
        );

        let result = status.wait().await;

        assert!(matches!(result, Err(StatusError::Timeout { .. })));
        assert_eq!(positioner.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn wait_lingers_for_settle_time() {
        let (positioner, _state) = record_positioner(2);
        let settle = Duration::from_millis(30);
        let status = track(&positioner, "MID", MoveOptions::default().settle_time(settle));
        assert!(status.done());

        let started = Instant::now();
        status.wait().await.unwrap();
        assert!(started.elapsed() >= settle);
    }
}
