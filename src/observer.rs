//! Observer sets
//!
//! Per-kind listener lists plus catch-all listeners. Every subscription
//! returns a [`Subscription`] capability that removes exactly that
//! registration, so listeners never need to be comparable.
//!
//! Listeners are invoked synchronously in subscription order. They should
//! be fast; anything expensive belongs on a channel.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Something that can be dispatched by kind
pub trait Observable {
    type Kind: Copy + Eq + Hash + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Listener callback
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Unique identifier for one subscription
pub type SubscriptionId = u64;

struct ObserverSet<E: Observable> {
    by_kind: HashMap<E::Kind, Vec<(SubscriptionId, Listener<E>)>>,
    catch_all: Vec<(SubscriptionId, Listener<E>)>,
    next_id: SubscriptionId,
}

impl<E: Observable> ObserverSet<E> {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.count();
        self.catch_all.retain(|(sid, _)| *sid != id);
        for listeners in self.by_kind.values_mut() {
            listeners.retain(|(sid, _)| *sid != id);
        }
        self.by_kind.retain(|_, listeners| !listeners.is_empty());
        self.count() < before
    }

    fn count(&self) -> usize {
        self.catch_all.len() + self.by_kind.values().map(Vec::len).sum::<usize>()
    }
}

/// Shared observer registry
pub struct Observers<E: Observable> {
    inner: Arc<Mutex<ObserverSet<E>>>,
}

impl<E: Observable> Clone for Observers<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Observable> Default for Observers<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ObserverSet {
                by_kind: HashMap::new(),
                catch_all: Vec::new(),
                next_id: 0,
            })),
        }
    }
}

impl<E: Observable + 'static> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E: Observable + 'static> Observers<E> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for one event kind
    pub fn subscribe<F>(&self, kind: E::Kind, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut set = self.lock();
        let id = set.next_id;
        set.next_id += 1;
        set.by_kind
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        drop(set);
        self.subscription(id)
    }

    /// Listen for every event
    pub fn subscribe_all<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut set = self.lock();
        let id = set.next_id;
        set.next_id += 1;
        set.catch_all.push((id, Arc::new(listener)));
        drop(set);
        self.subscription(id)
    }

    /// Deliver an event to its kind listeners, then to catch-all listeners
    ///
    /// The lock is released before listeners run, so a listener may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = {
            let set = self.lock();
            set.by_kind
                .get(&event.kind())
                .into_iter()
                .flatten()
                .chain(set.catch_all.iter())
                .map(|(_, l)| Arc::clone(l))
                .collect()
        };
        for listener in listeners {
            listener(event);
        }
    }

    /// Total registered listeners
    pub fn listener_count(&self) -> usize {
        self.lock().count()
    }

    fn lock(&self) -> MutexGuard<'_, ObserverSet<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscription(&self, id: SubscriptionId) -> Subscription {
        let weak: Weak<Mutex<ObserverSet<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            id,
            detach: Some(Box::new(move || match weak.upgrade() {
                Some(inner) => inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(id),
                None => false,
            })),
        }
    }
}

/// Capability to remove one registration
///
/// Dropping it keeps the listener registered.
pub struct Subscription {
    id: SubscriptionId,
    detach: Option<Box<dyn FnOnce() -> bool + Send + Sync>>,
}

impl Subscription {
    /// Subscription id
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the listener; `false` if it was already gone
    pub fn unsubscribe(mut self) -> bool {
        match self.detach.take() {
            Some(detach) => detach(),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
