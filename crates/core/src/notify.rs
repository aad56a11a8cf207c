//! Change notification fan-out.
//!
//! Each component owns one [`Notifier`] for its event enum. Components collect
//! the events produced while their internal lock is held, drop the lock, and
//! only then call [`Notifier::emit`]. Observers may therefore query the
//! component that notified them without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared observer callback.
pub type Observer<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`Notifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Guarded state in this workspace is always left consistent between
/// statements, so a poisoned lock carries no torn data.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callback registry for one event type.
pub struct Notifier<E> {
    observers: Mutex<Vec<(SubscriptionId, Observer<E>)>>,
    next_id: AtomicU64,
}

impl<E> Notifier<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an observer. Observers run in subscription order.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }

    /// Deliver one event to every observer.
    ///
    /// The observer list is snapshotted first so observers may subscribe or
    /// unsubscribe from inside a callback.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Observer<E>> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in snapshot {
            observer(event);
        }
    }

    /// Deliver a batch of events in order.
    pub fn emit_all<I>(&self, events: I)
    where
        I: IntoIterator<Item = E>,
    {
        for event in events {
            self.emit(&event);
        }
    }
}

impl<E: Clone + Send + 'static> Notifier<E> {
    /// Subscribe a recorder that keeps a copy of every event.
    pub fn record(&self) -> EventRecorder<E> {
        let recorder = EventRecorder {
            events: Arc::new(Mutex::new(Vec::new())),
        };
        let sink = Arc::clone(&recorder.events);
        self.subscribe(move |event: &E| lock(&sink).push(event.clone()));
        recorder
    }
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Collected copy of every event seen by a notifier.
#[derive(Clone)]
pub struct EventRecorder<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone> EventRecorder<E> {
    /// Copy of all events recorded so far.
    pub fn events(&self) -> Vec<E> {
        lock(&self.events).clone()
    }

    /// Number of recorded events matching a predicate.
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&E) -> bool,
    {
        lock(&self.events).iter().filter(|e| predicate(e)).count()
    }

    /// Total number of recorded events.
    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}
