//! Per-object subscription table

use super::{ObservedValue, ParameterObserver};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

struct Subscription {
    index: usize,
    observer: Arc<dyn ParameterObserver>,
}

/// Ordered list of observers attached to one object.
///
/// Subscription indices increase monotonically and are never reused.
/// Dropping the channel sends `on_complete` to every remaining observer.
pub struct ObservationChannel {
    subscriptions: RwLock<Vec<Subscription>>,
    next_index: AtomicUsize,
    active: AtomicUsize,
}

impl ObservationChannel {
    /// No subscribers
    pub fn new() -> Self {
        ObservationChannel {
            subscriptions: RwLock::new(Vec::new()),
            next_index: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
        }
    }

    /// Attach an observer; returns its index
    pub fn subscribe(&self, observer: Arc<dyn ParameterObserver>) -> usize {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let mut subscriptions = self.subscriptions.write();
        subscriptions.push(Subscription { index, observer });
        self.active.store(subscriptions.len(), Ordering::Release);
        debug!(index, subscribers = subscriptions.len(), "observer subscribed");
        index
    }

    /// Detach by identity; false if the observer was not attached
    pub fn unsubscribe(&self, observer: &Arc<dyn ParameterObserver>) -> bool {
        let target = Arc::as_ptr(observer) as *const ();
        self.remove_where(|s| Arc::as_ptr(&s.observer) as *const () == target)
    }

    /// Detach by index; false if no such subscription
    pub fn unsubscribe_index(&self, index: usize) -> bool {
        self.remove_where(|s| s.index == index)
    }

    fn remove_where(&self, matches: impl Fn(&Subscription) -> bool) -> bool {
        let removed = {
            let mut subscriptions = self.subscriptions.write();
            let position = subscriptions.iter().position(|s| matches(s));
            let removed = position.map(|p| subscriptions.remove(p));
            self.active.store(subscriptions.len(), Ordering::Release);
            removed
        };
        match removed {
            Some(subscription) => {
                debug!(index = subscription.index, "observer unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Number of attached observers
    pub fn len(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// No observers attached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// At least one observer attached; checked before any snapshot is taken
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.active.load(Ordering::Acquire) != 0
    }

    /// Deliver a record in subscription order.
    ///
    /// Observers run outside the table lock and may subscribe or
    /// unsubscribe; such changes apply from the next record.
    pub fn observe(&self, value: ObservedValue) {
        if !self.has_subscribers() {
            return;
        }
        let observers: Vec<Arc<dyn ParameterObserver>> = self
            .subscriptions
            .read()
            .iter()
            .map(|s| Arc::clone(&s.observer))
            .collect();
        trace!(quantity = value.name(), step = value.step(), observers = observers.len(), "delivering");
        for observer in observers {
            if observer.observes(value.name()) {
                observer.on_next(&value);
            }
        }
    }
}

impl Default for ObservationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationChannel")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl Drop for ObservationChannel {
    fn drop(&mut self) {
        for subscription in self.subscriptions.get_mut().drain(..) {
            subscription.observer.on_complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any::TypedValue;
    use crate::observe::ParameterObserverHistory;
    use crate::parameter::ParameterProperties;

    fn record(name: &str) -> ObservedValue {
        ObservedValue::new(0, name, TypedValue::new(1i64), "", ParameterProperties::NONE)
    }

    #[test]
    fn test_indices_and_removal() {
        let channel = ObservationChannel::new();
        let a: Arc<dyn ParameterObserver> = Arc::new(ParameterObserverHistory::new());
        let b: Arc<dyn ParameterObserver> = Arc::new(ParameterObserverHistory::new());

        assert_eq!(channel.subscribe(Arc::clone(&a)), 0);
        assert_eq!(channel.subscribe(Arc::clone(&b)), 1);
        assert_eq!(channel.len(), 2);

        assert!(channel.unsubscribe(&a));
        assert!(!channel.unsubscribe(&a));
        assert!(!channel.unsubscribe_index(0));
        assert!(channel.unsubscribe_index(1));
        assert!(channel.is_empty());

        assert_eq!(channel.subscribe(a), 2);
    }

    #[test]
    fn test_delivery_and_completion() {
        let history = Arc::new(ParameterObserverHistory::with_filter(["loss"]));
        {
            let channel = ObservationChannel::new();
            channel.observe(record("loss"));
            channel.subscribe(history.clone());
            channel.observe(record("loss"));
            channel.observe(record("other"));
            assert!(!history.completed());
        }
        assert_eq!(history.len(), 1);
        assert!(history.completed());
    }
}
