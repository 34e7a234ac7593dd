//! Commands whose enabled state follows their dependencies.
//!
//! A command binding registers three rules under the target key: one that
//! creates the [`Command`] for a context when it is attached, one that settles
//! its cached enabled state once every run-on-attach action has run, and one
//! triggered by the can-execute dependencies that re-evaluates it.

use std::{
    cell::Cell,
    fmt,
    rc::{Rc, Weak},
};

use propbind_notify::{ChangeCallback, Observable, PropertyNotifier, SubscriptionId};

use crate::{
    binder::PropertyBinder,
    error::{Error, Result},
    path::{IntoPaths, PathDescriptor},
    rule::Rule,
};

/// How [`Command::execute`] treats the can-execute condition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CheckMode {
    /// Execute only when the command can execute; otherwise do nothing.
    #[default]
    CheckBeforeExecute,
    /// Always execute.
    DoNotCheck,
    /// Never execute.
    DoNotExecute,
    /// Execute when the command can execute; otherwise fail with
    /// [`Error::InvalidOperation`].
    ThrowException,
}

/// The property name under which a command reports enabled-state changes.
pub const CAN_EXECUTE: &str = "can_execute";

/// An invokable command bound to one context.
///
/// The command holds its context weakly. Once the context is gone it cannot
/// execute and never runs its action.
pub struct Command<A: 'static = ()> {
    execute: Box<dyn Fn(&A)>,
    can_execute: Box<dyn Fn(&A) -> bool>,
    /// Argument-free evaluation, available for commands without an argument.
    probe: Option<Box<dyn Fn() -> bool>>,
    mode: CheckMode,
    enabled: Cell<bool>,
    notifier: PropertyNotifier,
}

impl<A: 'static> Default for Command<A> {
    /// A command bound to nothing: never enabled, never executes.
    fn default() -> Self {
        Self {
            execute: Box::new(|_| {}),
            can_execute: Box::new(|_| false),
            probe: None,
            mode: CheckMode::default(),
            enabled: Cell::new(false),
            notifier: PropertyNotifier::new(),
        }
    }
}

impl<A: 'static> Command<A> {
    pub fn can_execute(&self, arg: &A) -> bool {
        (self.can_execute)(arg)
    }

    pub fn execute(&self, arg: &A) -> Result<()> {
        let run = match self.mode {
            CheckMode::CheckBeforeExecute => self.can_execute(arg),
            CheckMode::DoNotCheck => true,
            CheckMode::DoNotExecute => false,
            CheckMode::ThrowException => {
                if !self.can_execute(arg) {
                    return Err(Error::InvalidOperation(
                        "command cannot execute in its current state",
                    ));
                }
                true
            }
        };
        if run {
            (self.execute)(arg);
        }
        Ok(())
    }

    pub fn check_mode(&self) -> CheckMode {
        self.mode
    }

    /// Subscribes to enabled-state changes.
    pub fn on_can_execute_changed(&self, callback: impl Fn() + 'static) -> SubscriptionId {
        self.notifier.subscribe(CAN_EXECUTE, Rc::new(callback))
    }

    /// Re-evaluates after a dependency changed.
    ///
    /// Argument-free commands notify only when the result flips. Commands
    /// taking an argument cannot be evaluated here and always notify.
    pub(crate) fn refresh(&self) {
        match &self.probe {
            Some(probe) => {
                let enabled = probe();
                if self.enabled.replace(enabled) != enabled {
                    self.notifier.notify(CAN_EXECUTE);
                }
            }
            None => self.notifier.notify(CAN_EXECUTE),
        }
    }

    /// Re-evaluates without notifying.
    pub(crate) fn settle(&self) {
        if let Some(probe) = &self.probe {
            self.enabled.set(probe());
        }
    }
}

impl Command<()> {
    /// Cached result of the last evaluation.
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

impl<A: 'static> Observable for Command<A> {
    fn subscribe(&self, property: &str, callback: ChangeCallback) -> SubscriptionId {
        self.notifier.subscribe(property, callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
    }
}

impl<A: 'static> fmt::Debug for Command<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("mode", &self.mode)
            .field("enabled", &self.enabled.get())
            .field("listeners", &self.notifier.subscriber_count())
            .finish()
    }
}

type CommandGetter<C, A> = Rc<dyn Fn(&C) -> Option<Rc<Command<A>>>>;

/// Shared, per-binder description of a command: what it does and when it is
/// enabled.
pub(crate) struct CommandBinding<C, A> {
    execute: Rc<dyn Fn(&C, &A)>,
    can_execute: Rc<dyn Fn(&C, &A) -> bool>,
    probe: Option<Rc<dyn Fn(&C) -> bool>>,
    mode: CheckMode,
}

impl<C: 'static, A: 'static> CommandBinding<C, A> {
    fn instantiate(&self, context: Weak<C>) -> Command<A> {
        let execute = self.execute.clone();
        let can_execute = self.can_execute.clone();
        let probe = self.probe.clone().map(|probe| {
            let context = context.clone();
            Box::new(move || context.upgrade().is_some_and(|ctx| probe(&*ctx))) as Box<dyn Fn() -> bool>
        });
        let command = Command {
            execute: Box::new({
                let context = context.clone();
                move |arg: &A| {
                    if let Some(ctx) = context.upgrade() {
                        execute(&*ctx, arg);
                    }
                }
            }),
            can_execute: Box::new(move |arg: &A| {
                context
                    .upgrade()
                    .is_some_and(|ctx| can_execute(&*ctx, arg))
            }),
            probe,
            mode: self.mode,
            enabled: Cell::new(false),
            notifier: PropertyNotifier::new(),
        };
        command.settle();
        command
    }
}

/// Builder returned by [`PropertyBinder::bind_command`] and
/// [`PropertyBinder::bind_command_with_arg`].
#[must_use = "a command binding does nothing until `to` is called"]
pub struct CommandRuleBuilder<'a, C: 'static, A: 'static> {
    binder: &'a mut PropertyBinder<C>,
    binding: CommandBinding<C, A>,
    dependencies: Result<Vec<PathDescriptor>>,
    key: Option<Box<str>>,
    can_override: bool,
}

impl<'a, C: 'static, A: 'static> CommandRuleBuilder<'a, C, A> {
    pub(crate) fn new(
        binder: &'a mut PropertyBinder<C>,
        execute: Rc<dyn Fn(&C, &A)>,
        can_execute: Rc<dyn Fn(&C, &A) -> bool>,
        probe: Option<Rc<dyn Fn(&C) -> bool>>,
    ) -> Self {
        Self {
            binder,
            binding: CommandBinding {
                execute,
                can_execute,
                probe,
                mode: CheckMode::default(),
            },
            dependencies: Ok(Vec::new()),
            key: None,
            can_override: true,
        }
    }

    /// The paths the can-execute condition reads.
    pub fn when(self, paths: impl IntoPaths) -> Self {
        self.with_dependency(paths)
    }

    /// Extra paths that re-evaluate the command, for conditions reading
    /// state their declared paths do not cover.
    pub fn with_dependency(mut self, paths: impl IntoPaths) -> Self {
        if let Ok(dependencies) = &mut self.dependencies {
            match paths.into_paths() {
                Ok(paths) => dependencies.extend(paths),
                Err(err) => self.dependencies = Err(err),
            }
        }
        self
    }

    pub fn with_check_mode(mut self, mode: CheckMode) -> Self {
        self.binding.mode = mode;
        self
    }

    /// Registers under `key` instead of the target key.
    pub fn override_key(mut self, key: impl Into<Box<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Keeps earlier bindings under the same key alive.
    pub fn do_not_override(mut self) -> Self {
        self.can_override = false;
        self
    }

    /// Binds the command to a target property.
    ///
    /// `get` reads the command currently assigned to a context, `set` assigns
    /// one.
    pub fn to(
        self,
        target: &str,
        get: impl Fn(&C) -> Option<Rc<Command<A>>> + 'static,
        set: impl Fn(&C, Option<Rc<Command<A>>>) + 'static,
    ) -> Result<()> {
        let Self {
            binder,
            binding,
            dependencies,
            key,
            can_override,
        } = self;
        let key: Box<str> = key.unwrap_or_else(|| target.into());
        let binding = Rc::new(binding);
        let get: CommandGetter<C, A> = Rc::new(get);

        let refresh = Rule::new({
            let get = get.clone();
            move |ctx: &Rc<C>| {
                if let Some(command) = get(&**ctx) {
                    command.refresh();
                }
            }
        })
        .with_triggers(dependencies)
        .key(key.clone())
        .can_override(can_override);
        binder.add_rule(refresh)?;

        let create = Rule::new(move |ctx: &Rc<C>| {
            let command = binding.instantiate(Rc::downgrade(ctx));
            set(&**ctx, Some(Rc::new(command)));
        })
        .key(key.clone())
        .run_on_attach(true);
        binder.add_rule(create)?;

        let settle = Rule::new(move |ctx: &Rc<C>| {
            if let Some(command) = get(&**ctx) {
                command.settle();
            }
        })
        .key(key)
        .settle_on_attach();
        binder.add_rule(settle)?;

        Ok(())
    }
}
