//! Step-change subscribers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::StepChange;

/// Trait for components that need to respond to step changes
pub trait StorySubscriber: Send + Sync {
    /// Called synchronously after the engine moved to a new step
    fn on_step_change(&self, change: &StepChange);
}

impl<F> StorySubscriber for F
where
    F: Fn(&StepChange) + Send + Sync,
{
    fn on_step_change(&self, change: &StepChange) {
        self(change)
    }
}

/// Registered step-change listeners
///
/// Delivery follows registration order within one notification. A listener
/// that navigates while being notified starts a nested notification, so
/// later listeners can see the newer step before the older one.
#[derive(Default)]
pub struct SubscriberSet {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(u64, Arc<dyn StorySubscriber>)>>,
}

impl SubscriberSet {
    pub(crate) fn add(&self, subscriber: Arc<dyn StorySubscriber>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, subscriber));
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Register a listener and hand back its detach handle
    pub fn subscribe(self: &Arc<Self>, subscriber: Arc<dyn StorySubscriber>) -> Subscription {
        let id = self.add(subscriber);
        Subscription::new(id, self)
    }

    /// Deliver `change` to every listener registered right now
    pub fn notify(&self, change: &StepChange) {
        for subscriber in self.snapshot() {
            subscriber.on_step_change(change);
        }
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Listeners at this instant. Delivery runs on the snapshot so listeners
    /// may (un)subscribe or navigate while being notified.
    fn snapshot(&self) -> Vec<Arc<dyn StorySubscriber>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Handle returned by `subscribe`
///
/// Dropping it keeps the listener registered; call
/// [`Subscription::unsubscribe`] to detach.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    set: Weak<SubscriberSet>,
}

impl Subscription {
    pub(crate) fn new(id: u64, set: &Arc<SubscriberSet>) -> Self {
        Self {
            id,
            set: Arc::downgrade(set),
        }
    }

    /// Detach the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        self.set.upgrade().map(|set| set.remove(self.id)).unwrap_or(false)
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSet").field("len", &self.len()).finish()
    }
}
