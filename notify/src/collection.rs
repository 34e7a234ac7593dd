use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    id::SubscriptionId,
    observable::{CollectionCallback, CollectionChange, Observable, ObservableCollection},
};

/// A vector of shared observable items that reports membership changes.
pub struct ObservableVec<T: Observable> {
    items: RefCell<Vec<Rc<T>>>,
    subscribers: RefCell<IndexMap<SubscriptionId, CollectionCallback>>,
}

impl<T: Observable> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Observable> ObservableVec<T> {
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    pub fn from_items(items: Vec<Rc<T>>) -> Self {
        Self {
            items: RefCell::new(items),
            subscribers: RefCell::new(IndexMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rc<T>> {
        self.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<Rc<T>> {
        self.items.borrow().clone()
    }

    pub fn push(&self, item: Rc<T>) {
        self.items.borrow_mut().push(item.clone());
        self.notify(CollectionChange {
            added: vec![item as Rc<dyn Observable>],
            removed: Vec::new(),
        });
    }

    /// Inserts at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, item: Rc<T>) {
        {
            let mut items = self.items.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, item.clone());
        }
        self.notify(CollectionChange {
            added: vec![item as Rc<dyn Observable>],
            removed: Vec::new(),
        });
    }

    pub fn remove(&self, index: usize) -> Option<Rc<T>> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.notify(CollectionChange {
            added: Vec::new(),
            removed: vec![removed.clone() as Rc<dyn Observable>],
        });
        Some(removed)
    }

    /// Removes the first occurrence of `item`, compared by pointer.
    pub fn remove_item(&self, item: &Rc<T>) -> bool {
        let index = self
            .items
            .borrow()
            .iter()
            .position(|existing| Rc::ptr_eq(existing, item));
        match index {
            Some(index) => self.remove(index).is_some(),
            None => false,
        }
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.items.borrow_mut());
        if removed.is_empty() {
            return;
        }
        self.notify(CollectionChange {
            added: Vec::new(),
            removed: removed.into_iter().map(|item| item as Rc<dyn Observable>).collect(),
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn notify(&self, change: CollectionChange) {
        let callbacks: SmallVec<[(SubscriptionId, CollectionCallback); 2]> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(id, callback)| (*id, callback.clone()))
            .collect();
        for (id, callback) in callbacks {
            if self.subscribers.borrow().contains_key(&id) {
                callback(&change);
            }
        }
    }
}

impl<T: Observable> ObservableCollection for ObservableVec<T> {
    fn subscribe_changes(&self, callback: CollectionCallback) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.subscribers.borrow_mut().insert(id, callback);
        id
    }

    fn unsubscribe_changes(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }

    fn items(&self) -> Vec<Rc<dyn Observable>> {
        self.items
            .borrow()
            .iter()
            .map(|item| item.clone() as Rc<dyn Observable>)
            .collect()
    }
}
