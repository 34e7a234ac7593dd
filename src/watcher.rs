//! Live subscriptions mirroring a [`PathGraph`](crate::PathGraph).
//!
//! A graph is compiled into immutable plans once per attach. Each bound
//! object gets an [`ObjectWatcher`] subscribed to the properties its plan
//! names; nested objects and collection members get their own watchers, which
//! are rebuilt whenever the value holding them changes.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use propbind_notify::{CollectionChange, Observable, ObservableCollection, SubscriptionId};
use smallvec::SmallVec;

use crate::registry::Action;

pub(crate) struct ObjectPlan<C> {
    pub(crate) members: Vec<MemberPlan<C>>,
}

impl<C> Default for ObjectPlan<C> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

pub(crate) struct MemberPlan<C> {
    pub(crate) name: Box<str>,
    /// Actions to run when this member is reassigned: the member's own and
    /// those of everything reached through it.
    pub(crate) fire: Rc<[Action<C>]>,
    pub(crate) shape: MemberShape<C>,
}

pub(crate) enum MemberShape<C> {
    Value,
    Object(Rc<ObjectPlan<C>>),
    Collection {
        /// Plan applied to every member of the collection.
        item: Rc<ObjectPlan<C>>,
        /// Actions to run when the membership changes.
        membership: Rc<[Action<C>]>,
    },
}

fn fire<C>(root: &Weak<C>, actions: &[Action<C>]) {
    let Some(root) = root.upgrade() else {
        return;
    };
    for action in actions {
        action(&root);
    }
}

fn same_object<T: ?Sized, U: ?Sized>(a: &Rc<T>, b: &Rc<U>) -> bool {
    std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

enum Child<C: 'static> {
    Value,
    Object(Rc<ObjectWatcher<C>>),
    Collection(Rc<CollectionWatcher<C>>),
}

struct BoundObject<C: 'static> {
    instance: Rc<dyn Observable>,
    subscriptions: SmallVec<[SubscriptionId; 4]>,
    children: Vec<Child<C>>,
}

struct ObjectWatcher<C: 'static> {
    plan: Rc<ObjectPlan<C>>,
    root: Weak<C>,
    bound: RefCell<Option<BoundObject<C>>>,
}

impl<C: 'static> ObjectWatcher<C> {
    fn new(plan: Rc<ObjectPlan<C>>, root: Weak<C>) -> Rc<Self> {
        Rc::new(Self {
            plan,
            root,
            bound: RefCell::new(None),
        })
    }

    /// Subscribes to `instance`, replacing any previous binding. `None`
    /// leaves the watcher dormant.
    fn bind(self: &Rc<Self>, instance: Option<Rc<dyn Observable>>) {
        self.unbind();
        let Some(instance) = instance else {
            return;
        };

        let mut subscriptions = SmallVec::new();
        let mut children = Vec::with_capacity(self.plan.members.len());
        for (index, member) in self.plan.members.iter().enumerate() {
            let this = Rc::downgrade(self);
            subscriptions.push(instance.subscribe(
                &member.name,
                Rc::new(move || {
                    if let Some(this) = this.upgrade() {
                        this.member_changed(index);
                    }
                }),
            ));

            let child = match &member.shape {
                MemberShape::Value => Child::Value,
                MemberShape::Object(plan) => {
                    let watcher = ObjectWatcher::new(plan.clone(), self.root.clone());
                    watcher.bind(object_member(&*instance, &member.name));
                    Child::Object(watcher)
                }
                MemberShape::Collection { item, membership } => {
                    let watcher =
                        CollectionWatcher::new(item.clone(), membership.clone(), self.root.clone());
                    watcher.bind(collection_member(&*instance, &member.name));
                    Child::Collection(watcher)
                }
            };
            children.push(child);
        }

        tracing::trace!(properties = subscriptions.len(), "object watcher bound");
        *self.bound.borrow_mut() = Some(BoundObject {
            instance,
            subscriptions,
            children,
        });
    }

    fn unbind(&self) {
        let Some(bound) = self.bound.borrow_mut().take() else {
            return;
        };
        for id in bound.subscriptions {
            bound.instance.unsubscribe(id);
        }
        for child in bound.children {
            match child {
                Child::Value => {}
                Child::Object(watcher) => watcher.unbind(),
                Child::Collection(watcher) => watcher.unbind(),
            }
        }
        tracing::trace!("object watcher unbound");
    }

    fn member_changed(self: &Rc<Self>, index: usize) {
        let (instance, child) = {
            let bound = self.bound.borrow();
            let Some(bound) = bound.as_ref() else {
                return;
            };
            let child = match &bound.children[index] {
                Child::Value => Child::Value,
                Child::Object(watcher) => Child::Object(watcher.clone()),
                Child::Collection(watcher) => Child::Collection(watcher.clone()),
            };
            (bound.instance.clone(), child)
        };

        let member = &self.plan.members[index];
        tracing::trace!(property = &*member.name, actions = member.fire.len(), "property changed");
        match child {
            Child::Value => {}
            Child::Object(watcher) => watcher.bind(object_member(&*instance, &member.name)),
            Child::Collection(watcher) => {
                watcher.bind(collection_member(&*instance, &member.name))
            }
        }
        fire(&self.root, &member.fire);
    }

    fn subscription_count(&self) -> usize {
        let bound = self.bound.borrow();
        let Some(bound) = bound.as_ref() else {
            return 0;
        };
        bound.subscriptions.len()
            + bound
                .children
                .iter()
                .map(|child| match child {
                    Child::Value => 0,
                    Child::Object(watcher) => watcher.subscription_count(),
                    Child::Collection(watcher) => watcher.subscription_count(),
                })
                .sum::<usize>()
    }
}

fn object_member(instance: &dyn Observable, name: &str) -> Option<Rc<dyn Observable>> {
    instance.member(name)?.as_object().cloned()
}

fn collection_member(instance: &dyn Observable, name: &str) -> Option<Rc<dyn ObservableCollection>> {
    instance.member(name)?.as_collection().cloned()
}

struct BoundCollection<C: 'static> {
    collection: Rc<dyn ObservableCollection>,
    subscription: SubscriptionId,
    items: Vec<(Rc<dyn Observable>, Rc<ObjectWatcher<C>>)>,
}

struct CollectionWatcher<C: 'static> {
    item_plan: Rc<ObjectPlan<C>>,
    fire: Rc<[Action<C>]>,
    root: Weak<C>,
    bound: RefCell<Option<BoundCollection<C>>>,
}

impl<C: 'static> CollectionWatcher<C> {
    fn new(item_plan: Rc<ObjectPlan<C>>, fire: Rc<[Action<C>]>, root: Weak<C>) -> Rc<Self> {
        Rc::new(Self {
            item_plan,
            fire,
            root,
            bound: RefCell::new(None),
        })
    }

    fn bind(self: &Rc<Self>, collection: Option<Rc<dyn ObservableCollection>>) {
        self.unbind();
        let Some(collection) = collection else {
            return;
        };

        let this = Rc::downgrade(self);
        let subscription = collection.subscribe_changes(Rc::new(move |change: &CollectionChange| {
            if let Some(this) = this.upgrade() {
                this.membership_changed(change);
            }
        }));
        let items = collection
            .items()
            .into_iter()
            .filter_map(|item| self.watch_item(item))
            .collect();

        *self.bound.borrow_mut() = Some(BoundCollection {
            collection,
            subscription,
            items,
        });
    }

    /// Members only need a watcher when the plan reaches into them.
    fn watch_item(&self, item: Rc<dyn Observable>) -> Option<(Rc<dyn Observable>, Rc<ObjectWatcher<C>>)> {
        if self.item_plan.members.is_empty() {
            return None;
        }
        let watcher = ObjectWatcher::new(self.item_plan.clone(), self.root.clone());
        watcher.bind(Some(item.clone()));
        Some((item, watcher))
    }

    fn unbind(&self) {
        let Some(bound) = self.bound.borrow_mut().take() else {
            return;
        };
        bound.collection.unsubscribe_changes(bound.subscription);
        for (_, watcher) in bound.items {
            watcher.unbind();
        }
    }

    fn membership_changed(self: &Rc<Self>, change: &CollectionChange) {
        if change.is_empty() {
            return;
        }
        let removed: SmallVec<[Rc<ObjectWatcher<C>>; 2]> = {
            let mut bound = self.bound.borrow_mut();
            let Some(bound) = bound.as_mut() else {
                return;
            };
            change
                .removed
                .iter()
                .filter_map(|item| {
                    let index = bound
                        .items
                        .iter()
                        .position(|(existing, _)| same_object(existing, item))?;
                    Some(bound.items.remove(index).1)
                })
                .collect()
        };
        for watcher in removed {
            watcher.unbind();
        }

        let added: Vec<_> = change
            .added
            .iter()
            .filter_map(|item| self.watch_item(item.clone()))
            .collect();
        if let Some(bound) = self.bound.borrow_mut().as_mut() {
            bound.items.extend(added);
        } else {
            // Unbound while the new members were being watched.
            for (_, watcher) in added {
                watcher.unbind();
            }
            return;
        }

        tracing::trace!(
            added = change.added.len(),
            removed = change.removed.len(),
            "collection changed"
        );
        fire(&self.root, &self.fire);
    }

    fn subscription_count(&self) -> usize {
        let bound = self.bound.borrow();
        let Some(bound) = bound.as_ref() else {
            return 0;
        };
        1 + bound
            .items
            .iter()
            .map(|(_, watcher)| watcher.subscription_count())
            .sum::<usize>()
    }
}

/// The live subscriptions of one attached context.
///
/// Dropping the tree or calling [`WatcherTree::dispose`] releases every
/// subscription. Disposing twice is a no-op.
pub struct WatcherTree<C: 'static> {
    plan: Rc<ObjectPlan<C>>,
    root: RefCell<Option<Rc<ObjectWatcher<C>>>>,
}

impl<C: 'static> WatcherTree<C> {
    pub(crate) fn new(plan: Rc<ObjectPlan<C>>) -> Self {
        Self {
            plan,
            root: RefCell::new(None),
        }
    }

    /// Subscribes along every watched path of `context`. Attaching an
    /// already attached tree moves it to the new context.
    pub fn attach(&self, context: &Rc<C>)
    where
        C: Observable,
    {
        self.dispose();
        let watcher = ObjectWatcher::new(self.plan.clone(), Rc::downgrade(context));
        watcher.bind(Some(context.clone() as Rc<dyn Observable>));
        *self.root.borrow_mut() = Some(watcher);
    }

    pub fn dispose(&self) {
        let watcher = self.root.borrow_mut().take();
        if let Some(watcher) = watcher {
            watcher.unbind();
            tracing::trace!("watcher tree disposed");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.root.borrow().is_some()
    }

    /// Live subscriptions held by the tree, collection subscriptions
    /// included.
    pub fn subscription_count(&self) -> usize {
        self.root
            .borrow()
            .as_ref()
            .map_or(0, |watcher| watcher.subscription_count())
    }
}

impl<C: 'static> Drop for WatcherTree<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<C: 'static> fmt::Debug for WatcherTree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherTree")
            .field("attached", &self.is_attached())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
