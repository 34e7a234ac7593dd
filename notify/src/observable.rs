use std::{fmt, rc::Rc};

use crate::id::SubscriptionId;

/// Callback invoked after a property value changed.
pub type ChangeCallback = Rc<dyn Fn()>;

/// Callback invoked after a collection's membership changed.
pub type CollectionCallback = Rc<dyn Fn(&CollectionChange)>;

/// An object that reports property changes by name.
///
/// Callbacks must be invoked synchronously, after the new value is visible,
/// and at most once per actual change.
pub trait Observable: 'static {
    fn subscribe(&self, property: &str, callback: ChangeCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// The current value of a nested object or collection property.
    ///
    /// `None` means the property is unset, or holds a plain value nobody
    /// needs to descend into.
    fn member(&self, property: &str) -> Option<Member> {
        let _ = property;
        None
    }
}

/// A collection whose membership changes are observable.
pub trait ObservableCollection: 'static {
    fn subscribe_changes(&self, callback: CollectionCallback) -> SubscriptionId;

    fn unsubscribe_changes(&self, id: SubscriptionId);

    /// Snapshot of the current members, in order.
    fn items(&self) -> Vec<Rc<dyn Observable>>;
}

/// A nested value reachable through a property.
#[derive(Clone)]
pub enum Member {
    Object(Rc<dyn Observable>),
    Collection(Rc<dyn ObservableCollection>),
}

impl Member {
    pub fn object<T: Observable>(value: Rc<T>) -> Self {
        Member::Object(value)
    }

    pub fn collection<T: ObservableCollection>(value: Rc<T>) -> Self {
        Member::Collection(value)
    }

    pub fn as_object(&self) -> Option<&Rc<dyn Observable>> {
        match self {
            Member::Object(object) => Some(object),
            Member::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Rc<dyn ObservableCollection>> {
        match self {
            Member::Object(_) => None,
            Member::Collection(collection) => Some(collection),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Object(object) => f
                .debug_tuple("Object")
                .field(&Rc::as_ptr(object).cast::<()>())
                .finish(),
            Member::Collection(collection) => f
                .debug_tuple("Collection")
                .field(&Rc::as_ptr(collection).cast::<()>())
                .finish(),
        }
    }
}

/// Items added to and removed from a collection by one mutation.
#[derive(Clone, Default)]
pub struct CollectionChange {
    pub added: Vec<Rc<dyn Observable>>,
    pub removed: Vec<Rc<dyn Observable>>,
}

impl CollectionChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl fmt::Debug for CollectionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionChange")
            .field("added", &self.added.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}
