//! Typed observable with explicit subscribe/unsubscribe
//!
//! Delivery contract:
//! - listeners run synchronously on the notifying thread, in registration
//!   (FIFO) order
//! - each notification works on the listener list as it was when the
//!   notification started: a listener added or removed from inside a
//!   callback takes effect from the next notification on
//! - no lock is held while listeners run, so callbacks may subscribe,
//!   unsubscribe or read state freely

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
#[cfg(feature = "observability")]
use tracing::trace;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Observable::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
}

/// Event emitter for values of type `T`
pub struct Observable<T> {
    registry: Mutex<Registry<T>>,
}

impl<T> Observable<T> {
    pub fn new() -> Self {
        Self { registry: Mutex::new(Registry { next_id: 0, listeners: Vec::new() }) }
    }

    /// Register `listener`; it receives every later notification
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; `false` if it was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(existing, _)| *existing != id);
        registry.listeners.len() != before
    }

    /// Deliver `value` to every current listener in FIFO order
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = {
            let registry = self.registry.lock();
            registry.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
        };

        #[cfg(feature = "observability")]
        trace!(listeners = snapshot.len(), "Notifying subscribers");

        for listener in snapshot {
            listener(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").field("subscribers", &self.subscriber_count()).finish()
    }
}
