//! Dependency registries.
//!
//! Every reactive key owns one [`Dep`]: the list of subscribers that read the
//! key during their last evaluation. Writing the key notifies the list.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::subscriber::Subscriber;

/// The subscriber list attached to one reactive key.
///
/// Cloning a `Dep` yields another handle to the same list.
#[derive(Clone, Default)]
pub struct Dep {
    subscribers: Rc<RefCell<Vec<Rc<Subscriber>>>>,
}

impl Dep {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber.
    ///
    /// Returns false if the subscriber is detached or if a subscriber with
    /// the same callback is already registered.
    pub fn add_subscriber(&self, subscriber: &Rc<Subscriber>) -> bool {
        if !subscriber.is_active() {
            return false;
        }
        let mut list = self.subscribers.borrow_mut();
        if list.iter().any(|s| s.shares_callback(subscriber)) {
            return false;
        }
        trace!(subscriber = subscriber.id(), "registered subscriber");
        list.push(Rc::clone(subscriber));
        true
    }

    /// Appends the subscribers of `other` that are not already present.
    pub fn merge(&self, other: &Dep) {
        if self.same(other) {
            return;
        }
        let incoming = other.subscribers.borrow().clone();
        for subscriber in &incoming {
            self.add_subscriber(subscriber);
        }
    }

    /// Calls `update` on every active subscriber.
    ///
    /// Detached subscribers are pruned first. The list is snapshotted so
    /// subscribers may register against this registry while updating.
    pub fn notify(&self) {
        let snapshot = {
            let mut list = self.subscribers.borrow_mut();
            list.retain(|s| s.is_active());
            list.clone()
        };
        trace!(count = snapshot.len(), "notifying subscribers");
        for subscriber in snapshot {
            subscriber.update();
        }
    }

    /// Returns the number of registered subscribers, detached ones included
    /// until the next notify.
    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    /// Returns true if `subscriber` (or one sharing its callback) is registered.
    pub fn contains(&self, subscriber: &Subscriber) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|s| s.shares_callback(subscriber))
    }

    /// Returns true if both handles point to the same list.
    pub fn same(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.subscribers, &other.subscribers)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep").field("subscribers", &self.len()).finish()
    }
}
