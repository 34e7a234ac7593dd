//! The dependency graph shared by every attachment of one binder.
//!
//! Nodes are keyed by property name within their parent, so rules sharing a
//! path prefix share nodes. A node records the actions whose dependency ends
//! exactly at it. Nodes that carry no action and lead to none are pruned.
//!
//! A collection-valued property owns a `[]` member node. Actions on the
//! property node watch the reference, actions on the member node watch the
//! membership, and the member node's children are watched on every member.

use std::{collections::BTreeSet, fmt, marker::PhantomData, rc::Rc};

use indexmap::IndexMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::{
    error::{Error, Result},
    path::PathDescriptor,
    registry::{Action, ActionId},
    watcher::{MemberPlan, MemberShape, ObjectPlan, WatcherTree},
};

new_key_type! {
    struct NodeId;
}

#[derive(Clone, Debug)]
enum Branch {
    /// The value is watched for changes only.
    Leaf,
    /// The value is an object; these are the watched properties on it.
    Plain(IndexMap<Box<str>, NodeId>),
    /// The value is a collection; this is its member node.
    Collection(NodeId),
}

#[derive(Clone, Debug)]
struct Node {
    name: Box<str>,
    parent: Option<NodeId>,
    /// Sorted, so registration order.
    actions: SmallVec<[ActionId; 2]>,
    branch: Branch,
}

impl Node {
    fn new(name: &str, parent: NodeId) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            actions: SmallVec::new(),
            branch: Branch::Leaf,
        }
    }

    fn is_dead(&self) -> bool {
        self.actions.is_empty()
            && match &self.branch {
                Branch::Leaf => true,
                Branch::Plain(children) => children.is_empty(),
                Branch::Collection(_) => false,
            }
    }
}

pub struct PathGraph<C> {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    _context: PhantomData<fn(&C)>,
}

impl<C> Clone for PathGraph<C> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            _context: PhantomData,
        }
    }
}

impl<C: 'static> Default for PathGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> PathGraph<C> {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            name: "".into(),
            parent: None,
            actions: SmallVec::new(),
            branch: Branch::Plain(IndexMap::new()),
        });
        Self {
            nodes,
            root,
            _context: PhantomData,
        }
    }

    /// Records `action` at the end of every path, creating missing nodes.
    ///
    /// Fails without modifying the graph when a path treats a property as a
    /// collection that another path treats as an object, or the reverse.
    pub fn add_action(&mut self, paths: &[PathDescriptor], action: ActionId) -> Result<()> {
        let mut staged = self.clone();
        staged.insert_action(paths, action)?;
        *self = staged;
        Ok(())
    }

    /// [`add_action`](Self::add_action) in place. On error the graph is left
    /// half-updated, so callers work on a staged copy.
    pub(crate) fn insert_action(&mut self, paths: &[PathDescriptor], action: ActionId) -> Result<()> {
        for path in paths {
            let terminal = Self::walk(&mut self.nodes, self.root, path)?;
            let actions = &mut self.nodes[terminal].actions;
            if let Err(index) = actions.binary_search(&action) {
                actions.insert(index, action);
            }
        }
        Ok(())
    }

    fn walk(nodes: &mut SlotMap<NodeId, Node>, root: NodeId, path: &PathDescriptor) -> Result<NodeId> {
        let conflict = |name: &str| Error::ShapeConflict {
            property: name.to_owned(),
        };

        let mut object = root;
        let last = path.len() - 1;
        for (i, step) in path.steps().iter().enumerate() {
            let child = Self::child(nodes, object, step.name());
            let terminal = i == last;

            match (&mut nodes[child].branch, step.is_collection(), terminal) {
                (Branch::Collection(_), false, false) => return Err(conflict(step.name())),
                (Branch::Plain(_), true, _) => return Err(conflict(step.name())),
                (branch @ Branch::Leaf, false, false) => *branch = Branch::Plain(IndexMap::new()),
                _ => {}
            }

            let next = if step.is_collection() {
                Self::item(nodes, child)
            } else {
                child
            };
            if terminal {
                return Ok(next);
            }
            object = next;
        }
        unreachable!("descriptors are never empty")
    }

    /// Gets or creates the property node `name` under the object node `parent`.
    fn child(nodes: &mut SlotMap<NodeId, Node>, parent: NodeId, name: &str) -> NodeId {
        if let Branch::Plain(children) = &nodes[parent].branch {
            if let Some(child) = children.get(name) {
                return *child;
            }
        }
        let child = nodes.insert(Node::new(name, parent));
        match &mut nodes[parent].branch {
            Branch::Plain(children) => {
                children.insert(name.into(), child);
            }
            branch @ Branch::Leaf => {
                let mut children = IndexMap::new();
                children.insert(name.into(), child);
                *branch = Branch::Plain(children);
            }
            Branch::Collection(_) => unreachable!("walk resolves collections to their item node"),
        }
        child
    }

    /// Gets or creates the member node of the collection node `collection`.
    fn item(nodes: &mut SlotMap<NodeId, Node>, collection: NodeId) -> NodeId {
        if let Branch::Collection(item) = nodes[collection].branch {
            return item;
        }
        let item = nodes.insert(Node::new("[]", collection));
        nodes[collection].branch = Branch::Collection(item);
        item
    }

    /// Removes `action` everywhere and prunes the nodes left dead.
    pub fn remove_action_cascade(&mut self, action: ActionId) {
        let holders: SmallVec<[NodeId; 4]> = self
            .nodes
            .iter_mut()
            .filter_map(|(id, node)| {
                let index = node.actions.binary_search(&action).ok()?;
                node.actions.remove(index);
                Some(id)
            })
            .collect();

        for id in holders {
            self.prune(id);
        }
    }

    fn prune(&mut self, mut id: NodeId) {
        while id != self.root {
            let parent = match self.nodes.get(id) {
                Some(node) if node.is_dead() => node.parent,
                _ => return,
            };
            let (Some(parent), Some(node)) = (parent, self.nodes.remove(id)) else {
                return;
            };

            match &mut self.nodes[parent].branch {
                Branch::Plain(children) => {
                    children.shift_remove(&node.name);
                    if children.is_empty() && parent != self.root {
                        self.nodes[parent].branch = Branch::Leaf;
                    }
                }
                // The member node was the only way into the collection.
                branch @ Branch::Collection(_) => *branch = Branch::Leaf,
                Branch::Leaf => {}
            }
            id = parent;
        }
    }

    /// True if any node carries an action.
    pub fn has_actions(&self) -> bool {
        self.subtree_has_actions(self.root)
    }

    fn subtree_has_actions(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        if !node.actions.is_empty() {
            return true;
        }
        match &node.branch {
            Branch::Leaf => false,
            Branch::Plain(children) => children.values().any(|child| self.subtree_has_actions(*child)),
            Branch::Collection(item) => self.subtree_has_actions(*item),
        }
    }

    /// True if `action` is recorded at any node.
    pub fn contains_action(&self, action: ActionId) -> bool {
        self.nodes
            .values()
            .any(|node| node.actions.binary_search(&action).is_ok())
    }

    /// Actions recorded at the node a path leads to, without creating it.
    pub fn actions_at(&self, path: &PathDescriptor) -> &[ActionId] {
        let mut object = self.root;
        let last = path.len() - 1;
        for (i, step) in path.steps().iter().enumerate() {
            let Branch::Plain(children) = &self.nodes[object].branch else {
                return &[];
            };
            let Some(&child) = children.get(step.name()) else {
                return &[];
            };
            let next = match (&self.nodes[child].branch, step.is_collection()) {
                (Branch::Collection(item), true) => *item,
                (_, false) => child,
                _ => return &[],
            };
            if i == last {
                return &self.nodes[next].actions;
            }
            object = next;
        }
        &[]
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A deep copy typed for a derived context. Action ids are shared.
    pub fn clone_for_derived_context<D>(&self) -> PathGraph<D> {
        PathGraph {
            nodes: self.nodes.clone(),
            root: self.root,
            _context: PhantomData,
        }
    }

    /// Compiles the graph into an unattached watcher tree.
    ///
    /// `resolve` maps action ids to the callable actions; ids it does not
    /// know are skipped.
    pub fn create_watcher(&self, resolve: impl Fn(ActionId) -> Option<Action<C>>) -> WatcherTree<C> {
        WatcherTree::new(self.object_plan(self.root, &resolve))
    }

    fn object_plan(
        &self,
        id: NodeId,
        resolve: &impl Fn(ActionId) -> Option<Action<C>>,
    ) -> Rc<ObjectPlan<C>> {
        let members = match &self.nodes[id].branch {
            Branch::Plain(children) => children
                .iter()
                .map(|(name, child)| MemberPlan {
                    name: name.clone(),
                    fire: self.fire_list(*child, resolve),
                    shape: self.member_shape(*child, resolve),
                })
                .collect(),
            Branch::Leaf | Branch::Collection(_) => Vec::new(),
        };
        Rc::new(ObjectPlan { members })
    }

    fn member_shape(
        &self,
        id: NodeId,
        resolve: &impl Fn(ActionId) -> Option<Action<C>>,
    ) -> MemberShape<C> {
        match &self.nodes[id].branch {
            Branch::Leaf => MemberShape::Value,
            Branch::Plain(_) => MemberShape::Object(self.object_plan(id, resolve)),
            Branch::Collection(item) => MemberShape::Collection {
                item: self.object_plan(*item, resolve),
                membership: self.fire_list(*item, resolve),
            },
        }
    }

    /// Every action at or below `id`, each once, in registration order.
    fn fire_list(&self, id: NodeId, resolve: &impl Fn(ActionId) -> Option<Action<C>>) -> Rc<[Action<C>]> {
        let mut ids = BTreeSet::new();
        self.collect_actions(id, &mut ids);
        ids.into_iter().filter_map(resolve).collect()
    }

    fn collect_actions(&self, id: NodeId, ids: &mut BTreeSet<ActionId>) {
        let node = &self.nodes[id];
        ids.extend(node.actions.iter().copied());
        match &node.branch {
            Branch::Leaf => {}
            Branch::Plain(children) => {
                for child in children.values() {
                    self.collect_actions(*child, ids);
                }
            }
            Branch::Collection(item) => self.collect_actions(*item, ids),
        }
    }
}

impl<C> fmt::Debug for PathGraph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Tree<'a, C>(&'a PathGraph<C>, NodeId);

        impl<C> fmt::Debug for Tree<'_, C> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let node = &self.0.nodes[self.1];
                let mut s = f.debug_struct(&node.name);
                s.field("actions", &node.actions);
                match &node.branch {
                    Branch::Leaf => {}
                    Branch::Plain(children) => {
                        for (name, child) in children {
                            s.field(name, &Tree(self.0, *child));
                        }
                    }
                    Branch::Collection(item) => {
                        s.field("[]", &Tree(self.0, *item));
                    }
                }
                s.finish()
            }
        }

        f.debug_tuple("PathGraph").field(&Tree(self, self.root)).finish()
    }
}
