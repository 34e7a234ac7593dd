//! Change notification for objects watched by `propbind`.
//!
//! The binder never reads scalar values itself. It only needs two things from
//! a bound object: a way to be told "property N changed", and a way to reach
//! the nested objects and collections it has to keep watching. [`Observable`]
//! and [`ObservableCollection`] describe that capability; [`PropertyNotifier`],
//! [`Property`] and [`ObservableVec`] are ready-made building blocks for
//! implementing it.

mod collection;
mod id;
mod notifier;
mod observable;
mod property;

pub use collection::ObservableVec;
pub use id::SubscriptionId;
pub use notifier::PropertyNotifier;
pub use observable::{
    ChangeCallback, CollectionCallback, CollectionChange, Member, Observable,
    ObservableCollection,
};
pub use property::Property;
