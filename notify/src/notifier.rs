use std::cell::RefCell;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{id::SubscriptionId, observable::ChangeCallback};

/// Per-object registry of property change subscribers.
///
/// Embed one in a type and forward [`Observable::subscribe`] and
/// [`Observable::unsubscribe`] to it.
///
/// [`Observable::subscribe`]: crate::Observable::subscribe
/// [`Observable::unsubscribe`]: crate::Observable::unsubscribe
#[derive(Default)]
pub struct PropertyNotifier {
    subscribers: RefCell<FxHashMap<Box<str>, IndexMap<SubscriptionId, ChangeCallback>>>,
    owners: RefCell<FxHashMap<SubscriptionId, Box<str>>>,
}

impl PropertyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, property: &str, callback: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.subscribers
            .borrow_mut()
            .entry(property.into())
            .or_default()
            .insert(id, callback);
        self.owners.borrow_mut().insert(id, property.into());
        id
    }

    /// Removes a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let Some(property) = self.owners.borrow_mut().remove(&id) else {
            return;
        };
        let mut subscribers = self.subscribers.borrow_mut();
        if let Some(callbacks) = subscribers.get_mut(&property) {
            callbacks.shift_remove(&id);
            if callbacks.is_empty() {
                subscribers.remove(&property);
            }
        }
    }

    /// Runs every callback subscribed to `property`, in subscription order.
    ///
    /// The subscriber list is snapshotted first so callbacks are free to
    /// subscribe and unsubscribe. A callback removed by an earlier one in the
    /// same round is skipped.
    pub fn notify(&self, property: &str) {
        let callbacks: SmallVec<[(SubscriptionId, ChangeCallback); 4]> = {
            let subscribers = self.subscribers.borrow();
            match subscribers.get(property) {
                Some(callbacks) => callbacks
                    .iter()
                    .map(|(id, callback)| (*id, callback.clone()))
                    .collect(),
                None => return,
            }
        };

        for (id, callback) in callbacks {
            if self.owners.borrow().contains_key(&id) {
                callback();
            }
        }
    }

    /// Number of live subscriptions across all properties.
    pub fn subscriber_count(&self) -> usize {
        self.owners.borrow().len()
    }

    /// Number of live subscriptions on one property.
    pub fn subscribers_of(&self, property: &str) -> usize {
        self.subscribers
            .borrow()
            .get(property)
            .map_or(0, IndexMap::len)
    }
}
