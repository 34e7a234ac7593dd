use std::{
    cell::{Ref, RefCell},
    fmt,
};

use crate::notifier::PropertyNotifier;

/// A named value cell that reports writes through a [`PropertyNotifier`].
pub struct Property<T> {
    name: &'static str,
    value: RefCell<T>,
}

impl<T> Property<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            value: RefCell::new(value),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Stores `value` and notifies, unless it equals the current value.
    ///
    /// Returns whether a notification went out.
    pub fn set(&self, notifier: &PropertyNotifier, value: T) -> bool
    where
        T: PartialEq,
    {
        self.set_by(notifier, value, |old, new| old == new)
    }

    /// Like [`Property::set`] with a custom equality, e.g. `Rc::ptr_eq` for
    /// object references.
    pub fn set_by(
        &self,
        notifier: &PropertyNotifier,
        value: T,
        same: impl FnOnce(&T, &T) -> bool,
    ) -> bool {
        {
            let mut current = self.value.borrow_mut();
            if same(&current, &value) {
                return false;
            }
            *current = value;
        }
        notifier.notify(self.name);
        true
    }

    /// Stores `value` and always notifies.
    pub fn replace(&self, notifier: &PropertyNotifier, value: T) -> T {
        let old = self.value.replace(value);
        notifier.notify(self.name);
        old
    }

    /// Mutates in place and always notifies.
    pub fn update<R>(&self, notifier: &PropertyNotifier, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.value.borrow_mut());
        notifier.notify(self.name);
        result
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("value", &self.value.borrow())
            .finish()
    }
}
