//! Rating change broadcast.
//!
//! Views holding a reference to the catalog subscribe here and receive every
//! rating correction made through any other view. Delivery is synchronous and
//! in registration order; a failing listener is logged and skipped.

use super::catalog::Snapshot;
use crate::core::movie::MovieId;
use crate::rating::DisplayRating;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::warn;
use uuid::Uuid;

/// A corrected displayed rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingChangeEvent {
    pub movie_id: MovieId,
    pub rating: DisplayRating,
    pub user_derived: bool,
}

impl RatingChangeEvent {
    pub fn new(movie_id: MovieId, rating: DisplayRating) -> Self {
        Self {
            movie_id,
            rating,
            user_derived: rating.is_user_derived(),
        }
    }
}

type Listener = Arc<dyn Fn(&RatingChangeEvent, &Snapshot) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: Mutex<Vec<(Uuid, Listener)>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Vec<(Uuid, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: Uuid) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    fn contains(&self, id: Uuid) -> bool {
        self.lock().iter().any(|(registered, _)| *registered == id)
    }
}

/// Observer registry for rating corrections
#[derive(Clone, Default)]
pub struct RatingUpdateBus {
    registry: Arc<Registry>,
}

/// Handle to a registered listener.
///
/// Revoked by [`Subscription::cancel`], [`RatingUpdateBus::unsubscribe`] or
/// by dropping it; revoking twice is a no-op.
#[must_use = "dropping a subscription unsubscribes it"]
pub struct Subscription {
    id: Uuid,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop receiving events. Returns whether the listener was still registered.
    pub fn cancel(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.remove(self.id))
            .unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl RatingUpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, called with the event and the snapshot after the update
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RatingChangeEvent, &Snapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.registry.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a listener; a second call with the same handle does nothing
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.registry.remove(subscription.id)
    }

    pub fn listener_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Deliver `event` to every listener registered when the call starts.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe; one removed mid-delivery is not called afterwards.
    /// Returns the number of listeners that handled the event successfully.
    pub(crate) fn publish(&self, event: &RatingChangeEvent, snapshot: &Snapshot) -> usize {
        let listeners: Vec<(Uuid, Listener)> = self.registry.lock().clone();
        let mut delivered = 0;

        for (id, listener) in listeners {
            if !self.registry.contains(id) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event, snapshot))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => warn!(
                    subscription = %id,
                    movie_id = %event.movie_id,
                    error = %err,
                    "rating listener failed"
                ),
                Err(_) => warn!(
                    subscription = %id,
                    movie_id = %event.movie_id,
                    "rating listener panicked"
                ),
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fallback_dataset;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> Snapshot {
        Arc::new(fallback_dataset())
    }

    fn event() -> RatingChangeEvent {
        RatingChangeEvent::new(MovieId(1), DisplayRating::rated(3.5, true))
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = RatingUpdateBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = Arc::clone(&order);
            bus.subscribe(move |_, _| {
                order.lock().unwrap().push("first");
                Ok(())
            })
        };
        let second = {
            let order = Arc::clone(&order);
            bus.subscribe(move |_, _| {
                order.lock().unwrap().push("second");
                Ok(())
            })
        };

        assert_eq!(bus.publish(&event(), &snapshot()), 2);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        drop((first, second));
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let bus = RatingUpdateBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _failing = bus.subscribe(|_, _| Err(anyhow::anyhow!("view is gone")));
        let _panicking = bus.subscribe(|_, _| panic!("render bug"));
        let _counting = {
            let calls = Arc::clone(&calls);
            bus.subscribe(move |event, snapshot| {
                assert_eq!(event.rating.value(), Some(3.5));
                assert_eq!(snapshot.len(), 3);
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        assert_eq!(bus.publish(&event(), &snapshot()), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = RatingUpdateBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let calls = Arc::clone(&calls);
            bus.subscribe(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        assert!(subscription.is_active());
        assert!(bus.unsubscribe(&subscription));
        assert!(!bus.unsubscribe(&subscription));
        assert!(!subscription.cancel());

        bus.publish(&event(), &snapshot());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_drop_releases_listener() {
        let bus = RatingUpdateBus::new();
        {
            let _view = bus.subscribe(|_, _| Ok(()));
            assert_eq!(bus.listener_count(), 1);
        }
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_unsubscribe_another_mid_delivery() {
        let bus = RatingUpdateBus::new();
        let late_calls = Arc::new(AtomicUsize::new(0));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let _killer = {
            let victim = Arc::clone(&victim);
            bus.subscribe(move |_, _| {
                if let Some(subscription) = victim.lock().unwrap().take() {
                    subscription.cancel();
                }
                Ok(())
            })
        };
        let late = {
            let late_calls = Arc::clone(&late_calls);
            bus.subscribe(move |_, _| {
                late_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        *victim.lock().unwrap() = Some(late);

        assert_eq!(bus.publish(&event(), &snapshot()), 1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
    }
}
