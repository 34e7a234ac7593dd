#![allow(dead_code)]

use std::rc::Rc;

use propbind::{
    Command,
    notify::{Member, Observable, ObservableVec, Property, PropertyNotifier, SubscriptionId},
};

/// A context exposing one property of every kind the binder handles.
pub struct Stub {
    notifier: PropertyNotifier,
    flag: Property<bool>,
    int: Property<i32>,
    string: Property<Option<String>>,
    nested: Property<Option<Rc<Stub>>>,
    items: Property<Option<Rc<ObservableVec<Stub>>>>,
    command: Property<Option<Rc<Command>>>,
    arg_command: Property<Option<Rc<Command<i32>>>>,
}

impl Default for Stub {
    fn default() -> Self {
        Self {
            notifier: PropertyNotifier::new(),
            flag: Property::new("flag", false),
            int: Property::new("int", 0),
            string: Property::new("string", None),
            nested: Property::new("nested", None),
            items: Property::new("items", None),
            command: Property::new("command", None),
            arg_command: Property::new("arg_command", None),
        }
    }
}

fn same<T>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl Stub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_nested(nested: Rc<Stub>) -> Rc<Self> {
        let stub = Self::default();
        stub.nested.set_by(&stub.notifier, Some(nested), same);
        Rc::new(stub)
    }

    pub fn with_items(items: Vec<Rc<Stub>>) -> Rc<Self> {
        let stub = Self::default();
        stub.items.set_by(
            &stub.notifier,
            Some(Rc::new(ObservableVec::from_items(items))),
            same,
        );
        Rc::new(stub)
    }

    pub fn flag(&self) -> bool {
        self.flag.get()
    }

    pub fn set_flag(&self, value: bool) {
        self.flag.set(&self.notifier, value);
    }

    pub fn int(&self) -> i32 {
        self.int.get()
    }

    pub fn set_int(&self, value: i32) {
        self.int.set(&self.notifier, value);
    }

    pub fn string(&self) -> Option<String> {
        self.string.get()
    }

    pub fn set_string(&self, value: Option<&str>) {
        self.string.set(&self.notifier, value.map(str::to_owned));
    }

    pub fn nested(&self) -> Option<Rc<Stub>> {
        self.nested.get()
    }

    pub fn set_nested(&self, value: Option<Rc<Stub>>) {
        self.nested.set_by(&self.notifier, value, same);
    }

    pub fn items(&self) -> Option<Rc<ObservableVec<Stub>>> {
        self.items.get()
    }

    pub fn set_items(&self, value: Option<Rc<ObservableVec<Stub>>>) {
        self.items.set_by(&self.notifier, value, same);
    }

    pub fn command(&self) -> Option<Rc<Command>> {
        self.command.get()
    }

    pub fn set_command(&self, value: Option<Rc<Command>>) {
        self.command.set_by(&self.notifier, value, same);
    }

    pub fn arg_command(&self) -> Option<Rc<Command<i32>>> {
        self.arg_command.get()
    }

    pub fn set_arg_command(&self, value: Option<Rc<Command<i32>>>) {
        self.arg_command.set_by(&self.notifier, value, same);
    }

    /// Subscriptions currently held on this object by anyone.
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }
}

impl Observable for Stub {
    fn subscribe(&self, property: &str, callback: Rc<dyn Fn()>) -> SubscriptionId {
        self.notifier.subscribe(property, callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
    }

    fn member(&self, property: &str) -> Option<Member> {
        match property {
            "nested" => self.nested().map(Member::object),
            "items" => self.items().map(Member::collection),
            "command" => self.command().map(Member::object),
            _ => None,
        }
    }
}

/// Counts calls of the closures it hands out.
#[derive(Clone, Default)]
pub struct Counter(Rc<std::cell::Cell<usize>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    pub fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }
}
