use std::{fmt, rc::Rc};

use propbind_notify::Observable;

use crate::{
    bind::PropertyRuleBuilder,
    command::CommandRuleBuilder,
    error::Result,
    graph::PathGraph,
    path::IntoPaths,
    registry::{ActionId, RuleRegistry},
    rule::Rule,
    watcher::WatcherTree,
};

/// A binder configuration: the rules for one context type.
///
/// Rules are registered once and shared by every context attached
/// afterwards. Each [`attach`](PropertyBinder::attach) returns its own
/// [`WatcherTree`]; drop or dispose it to stop propagation.
///
/// ```rust,ignore
/// let mut binder = PropertyBinder::<Invoice>::new();
/// binder
///     .bind("lines[].amount", |inv: &Invoice| inv.sum())
///     .to("total", |inv, total| inv.set_total(total))?;
///
/// let invoice = Rc::new(Invoice::default());
/// let _attached = binder.attach(&invoice);
/// ```
pub struct PropertyBinder<C: 'static> {
    graph: PathGraph<C>,
    registry: RuleRegistry<C>,
}

impl<C: 'static> Default for PropertyBinder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Clone for PropertyBinder<C> {
    /// An independent copy: rules added to either side later do not affect
    /// the other.
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<C: 'static> fmt::Debug for PropertyBinder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinder")
            .field("graph", &self.graph)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<C: 'static> PropertyBinder<C> {
    pub fn new() -> Self {
        Self {
            graph: PathGraph::new(),
            registry: RuleRegistry::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Rule<C>) -> Result<ActionId> {
        self.registry.add_rule(&mut self.graph, rule)
    }

    /// Removes every rule registered under `key`. Returns false when there
    /// was none.
    pub fn remove_rule(&mut self, key: &str) -> bool {
        self.registry.remove_rule(&mut self.graph, key)
    }

    pub fn unbind(&mut self, key: &str) -> bool {
        self.remove_rule(key)
    }

    /// Keeps a target property equal to `source`, re-evaluated whenever one
    /// of `paths` changes.
    pub fn bind<T: 'static>(
        &mut self,
        paths: impl IntoPaths,
        source: impl Fn(&C) -> T + 'static,
    ) -> PropertyRuleBuilder<'_, C, T> {
        PropertyRuleBuilder::new(self, paths, Rc::new(source))
    }

    /// Binds a command without an argument.
    pub fn bind_command(
        &mut self,
        execute: impl Fn(&C) + 'static,
        can_execute: impl Fn(&C) -> bool + 'static,
    ) -> CommandRuleBuilder<'_, C, ()> {
        let can_execute = Rc::new(can_execute);
        let probe = can_execute.clone();
        CommandRuleBuilder::new(
            self,
            Rc::new(move |ctx: &C, _: &()| execute(ctx)),
            Rc::new(move |ctx: &C, _: &()| can_execute(ctx)),
            Some(Rc::new(move |ctx: &C| probe(ctx))),
        )
    }

    /// Binds a command taking an argument of type `A`.
    pub fn bind_command_with_arg<A: 'static>(
        &mut self,
        execute: impl Fn(&C, &A) + 'static,
        can_execute: impl Fn(&C, &A) -> bool + 'static,
    ) -> CommandRuleBuilder<'_, C, A> {
        CommandRuleBuilder::new(self, Rc::new(execute), Rc::new(can_execute), None)
    }

    pub fn graph(&self) -> &PathGraph<C> {
        &self.graph
    }

    pub fn registry(&self) -> &RuleRegistry<C> {
        &self.registry
    }

    pub fn has_rules(&self) -> bool {
        !self.registry.is_empty()
    }

    /// A copy for a context type `D` that embeds a `C`.
    ///
    /// `project` reaches the embedded context; the rules keep acting on it,
    /// while the watched paths are resolved on `D` itself. The copy is
    /// independent of `self`.
    pub fn derive<D: 'static>(&self, project: impl Fn(&Rc<D>) -> Rc<C> + 'static) -> PropertyBinder<D> {
        PropertyBinder {
            graph: self.graph.clone_for_derived_context(),
            registry: self.registry.derive(Rc::new(project)),
        }
    }
}

impl<C: Observable> PropertyBinder<C> {
    /// Runs the run-on-attach actions against `context`, then starts live
    /// propagation.
    pub fn attach(&self, context: &Rc<C>) -> WatcherTree<C> {
        tracing::trace!(rules = self.registry.len(), "attaching context");
        self.registry.run_attach_actions(context);
        let watcher = self.graph.create_watcher(|id| self.registry.action(id));
        watcher.attach(context);
        watcher
    }
}
