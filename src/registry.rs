use std::{fmt, rc::Rc};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    error::Result,
    graph::PathGraph,
    rule::{AttachPhase, Rule},
};

/// An action run against the root context.
pub type Action<C> = Rc<dyn Fn(&Rc<C>)>;

/// Identity of a registered action. Ids grow with registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub(crate) u64);

/// Keyed rule bookkeeping: which actions live under which key, and which
/// actions run when a context is attached.
pub struct RuleRegistry<C: 'static> {
    next_id: u64,
    actions: IndexMap<ActionId, Action<C>>,
    keyed: FxHashMap<Box<str>, SmallVec<[ActionId; 2]>>,
    on_attach: IndexSet<ActionId>,
    on_settle: IndexSet<ActionId>,
}

impl<C: 'static> Default for RuleRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Clone for RuleRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            next_id: self.next_id,
            actions: self.actions.clone(),
            keyed: self.keyed.clone(),
            on_attach: self.on_attach.clone(),
            on_settle: self.on_settle.clone(),
        }
    }
}

impl<C: 'static> fmt::Debug for RuleRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("keyed", &self.keyed)
            .field("on_attach", &self.on_attach)
            .field("on_settle", &self.on_settle)
            .finish()
    }
}

impl<C: 'static> RuleRegistry<C> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            actions: IndexMap::new(),
            keyed: FxHashMap::default(),
            on_attach: IndexSet::new(),
            on_settle: IndexSet::new(),
        }
    }

    /// Registers `rule`, placing its action in `graph`.
    ///
    /// With a key and `can_override`, every action previously registered
    /// under that key is removed first. Either the whole registration
    /// applies or, on error, nothing changes.
    pub fn add_rule(&mut self, graph: &mut PathGraph<C>, rule: Rule<C>) -> Result<ActionId> {
        let Rule {
            action,
            key,
            run_on_attach,
            phase,
            can_override,
            triggers,
        } = rule;
        let triggers = triggers?;

        let id = ActionId(self.next_id);

        let superseded: SmallVec<[ActionId; 2]> = match &key {
            Some(key) if can_override => self.keyed.get(key).cloned().unwrap_or_default(),
            _ => SmallVec::new(),
        };

        let mut staged = graph.clone();
        for old in &superseded {
            staged.remove_action_cascade(*old);
        }
        staged.insert_action(&triggers, id)?;
        *graph = staged;

        self.next_id += 1;
        for old in &superseded {
            self.forget(*old);
        }
        if let Some(key) = key {
            tracing::debug!(key = &*key, ?id, overridden = superseded.len(), "keyed rule registered");
            let entry = self.keyed.entry(key).or_default();
            entry.retain(|existing| !superseded.contains(existing));
            entry.push(id);
        } else {
            tracing::debug!(?id, "rule registered");
        }

        self.actions.insert(id, action);
        if run_on_attach {
            match phase {
                AttachPhase::Initial => self.on_attach.insert(id),
                AttachPhase::Settle => self.on_settle.insert(id),
            };
        }
        Ok(id)
    }

    /// Removes every action registered under `key`, pruning the graph.
    ///
    /// Returns false when the key is unknown.
    pub fn remove_rule(&mut self, graph: &mut PathGraph<C>, key: &str) -> bool {
        let Some(actions) = self.keyed.remove(key) else {
            return false;
        };
        tracing::debug!(key, removed = actions.len(), "keyed rule removed");
        for id in actions {
            graph.remove_action_cascade(id);
            self.forget(id);
        }
        true
    }

    fn forget(&mut self, id: ActionId) {
        self.actions.shift_remove(&id);
        self.on_attach.shift_remove(&id);
        self.on_settle.shift_remove(&id);
    }

    pub fn action(&self, id: ActionId) -> Option<Action<C>> {
        self.actions.get(&id).cloned()
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.actions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions registered under `key`, in registration order.
    pub fn keyed(&self, key: &str) -> &[ActionId] {
        match self.keyed.get(key) {
            Some(actions) => actions,
            None => &[],
        }
    }

    pub fn attach_actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.on_attach.iter().copied()
    }

    /// Runs the run-on-attach actions in registration order.
    pub(crate) fn run_attach_actions(&self, context: &Rc<C>) {
        Self::run_all(&self.actions, &self.on_attach, context);
        Self::run_all(&self.actions, &self.on_settle, context);
    }

    fn run_all(actions: &IndexMap<ActionId, Action<C>>, ids: &IndexSet<ActionId>, context: &Rc<C>) {
        let pending: SmallVec<[Action<C>; 8]> = ids
            .iter()
            .filter_map(|id| actions.get(id).cloned())
            .collect();
        for action in pending {
            action(context);
        }
    }

    pub(crate) fn derive<D: 'static>(
        &self,
        project: Rc<dyn Fn(&Rc<D>) -> Rc<C>>,
    ) -> RuleRegistry<D> {
        let actions = self
            .actions
            .iter()
            .map(|(id, action)| {
                let action = action.clone();
                let project = project.clone();
                let derived: Action<D> = Rc::new(move |context: &Rc<D>| action(&project(context)));
                (*id, derived)
            })
            .collect();
        RuleRegistry {
            next_id: self.next_id,
            actions,
            keyed: self.keyed.clone(),
            on_attach: self.on_attach.clone(),
            on_settle: self.on_settle.clone(),
        }
    }
}
