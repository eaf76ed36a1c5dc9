//! Element tree and subtree-scoped event channel.
//!
//! DESIGN
//! ======
//! The tree is an arena of nodes keyed by never-reused `NodeId`s. Each node
//! holds its parent/children links, an optional tree-unique element id, its
//! listeners, and a `Role` carrying the element's shared core. Element
//! handles (`DataSource`, `ListView`, ...) are `(Tree, NodeId, Rc<core>)`
//! triples; cores never hold the tree, so there are no `Rc` cycles.
//!
//! Cross-element wiring goes through the typed registry
//! ([`Tree::data_source`]) rather than a global lookup.
//!
//! DISPATCH
//! ========
//! Listener callbacks are cloned out of the arena before they run, so a
//! callback may freely mutate the tree, add or drop listeners, or dispatch
//! nested events. A listener removed mid-dispatch still sees the event that
//! was already in flight on its node.

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::components::button::TriggerCore;
use crate::components::card::Card;
use crate::components::data_source::{DataSource, SourceCore};
use crate::components::form::FormCore;
use crate::components::list_view::ListCore;
use crate::components::text_box::FieldCore;
use crate::error::TreeError;
use crate::event::{Event, EventKind, Payload};

// =============================================================================
// IDS
// =============================================================================

/// Arena key for one element. Never reused within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle for one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<dyn Fn(&Event)>;

// =============================================================================
// NODES
// =============================================================================

/// Element-specific state attached to a node. The node owns the core; its
/// listeners only hold weak references to it.
#[derive(Clone)]
pub(crate) enum Role {
    Container,
    DataSource(Rc<SourceCore>),
    List(Rc<ListCore>),
    Card(Card),
    Field(Rc<FieldCore>),
    // Held for ownership only.
    Trigger(#[allow(dead_code)] Rc<TriggerCore>),
    Form(#[allow(dead_code)] Rc<FormCore>),
}

struct Listener {
    id: ListenerId,
    kind: EventKind,
    callback: Callback,
}

struct Node {
    tag: String,
    element_id: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<Listener>,
    role: Role,
}

struct TreeInner {
    nodes: HashMap<NodeId, Node>,
    ids: HashMap<String, NodeId>,
    next_node: u64,
    next_listener: u64,
}

// =============================================================================
// TREE
// =============================================================================

/// Shared handle to an element tree. Cloning shares the same tree.
#[derive(Clone)]
pub struct Tree {
    inner: Rc<RefCell<TreeInner>>,
}

/// Non-owning tree handle, held by listener closures and subscriptions.
#[derive(Clone)]
pub struct WeakTree(Weak<RefCell<TreeInner>>);

impl WeakTree {
    #[must_use]
    pub fn upgrade(&self) -> Option<Tree> {
        self.0.upgrade().map(|inner| Tree { inner })
    }
}

const ROOT: NodeId = NodeId(0);

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    #[must_use]
    pub fn new() -> Self {
        let root = Node {
            tag: "root".to_owned(),
            element_id: None,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
            role: Role::Container,
        };
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, root);
        Self {
            inner: Rc::new(RefCell::new(TreeInner { nodes, ids: HashMap::new(), next_node: 1, next_listener: 0 })),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        ROOT
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakTree {
        WeakTree(Rc::downgrade(&self.inner))
    }

    /// Append a plain grouping element.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if `parent` is not in the tree.
    pub fn element(&self, parent: NodeId, tag: &str) -> Result<NodeId, TreeError> {
        self.insert(parent, tag, None, Role::Container)
    }

    pub(crate) fn insert(
        &self,
        parent: NodeId,
        tag: &str,
        element_id: Option<&str>,
        role: Role,
    ) -> Result<NodeId, TreeError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.nodes.contains_key(&parent) {
            return Err(TreeError::Detached(parent));
        }
        if let Some(id) = element_id {
            if inner.ids.contains_key(id) {
                return Err(TreeError::DuplicateId(id.to_owned()));
            }
        }

        let node_id = NodeId(inner.next_node);
        inner.next_node += 1;
        if let Some(id) = element_id {
            inner.ids.insert(id.to_owned(), node_id);
        }
        inner.nodes.insert(
            node_id,
            Node {
                tag: tag.to_owned(),
                element_id: element_id.map(str::to_owned),
                parent: Some(parent),
                children: Vec::new(),
                listeners: Vec::new(),
                role,
            },
        );
        if let Some(p) = inner.nodes.get_mut(&parent) {
            p.children.push(node_id);
        }
        trace!(node = %node_id, %tag, "element attached");
        Ok(node_id)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.borrow().nodes.contains_key(&node)
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().nodes.get(&node).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.inner.borrow().nodes.get(&node).map(|n| n.tag.clone())
    }

    #[must_use]
    pub fn element_id(&self, node: NodeId) -> Option<String> {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .and_then(|n| n.element_id.clone())
    }

    /// Resolve a tree-unique element id.
    #[must_use]
    pub fn lookup(&self, element_id: &str) -> Option<NodeId> {
        self.inner.borrow().ids.get(element_id).copied()
    }

    /// Typed registry accessor: the data source registered under `element_id`.
    #[must_use]
    pub fn data_source(&self, element_id: &str) -> Option<DataSource> {
        self.data_source_at(self.lookup(element_id)?)
    }

    /// The data source living at `node`, if that node is one.
    pub(crate) fn data_source_at(&self, node: NodeId) -> Option<DataSource> {
        match self.role(node)? {
            Role::DataSource(core) => Some(DataSource::from_parts(self.clone(), node, core)),
            _ => None,
        }
    }

    /// All nodes below `node` in document (pre-)order, excluding `node`.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = inner
            .nodes
            .get(&node)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = inner.nodes.get(&id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    pub(crate) fn role(&self, node: NodeId) -> Option<Role> {
        self.inner.borrow().nodes.get(&node).map(|n| n.role.clone())
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Register `callback` for `kind` events arriving at `node`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if `node` is not in the tree.
    pub fn listen(&self, node: NodeId, kind: EventKind, callback: impl Fn(&Event) + 'static) -> Result<ListenerId, TreeError> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let n = inner.nodes.get_mut(&node).ok_or(TreeError::Detached(node))?;
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        n.listeners.push(Listener { id, kind, callback: Rc::new(callback) });
        Ok(id)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unlisten(&self, node: NodeId, listener: ListenerId) -> bool {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            return false;
        };
        let Some(n) = inner.nodes.get_mut(&node) else {
            return false;
        };
        let before = n.listeners.len();
        n.listeners.retain(|l| l.id != listener);
        n.listeners.len() != before
    }

    /// Like [`Tree::listen`], but the listener lives as long as the guard.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if `node` is not in the tree.
    pub fn subscribe(&self, node: NodeId, kind: EventKind, callback: impl Fn(&Event) + 'static) -> Result<Subscription, TreeError> {
        let listener = self.listen(node, kind, callback)?;
        Ok(Subscription { tree: self.downgrade(), node, listener })
    }

    /// Number of `kind` listeners registered directly on `node`.
    #[must_use]
    pub fn listener_count(&self, node: NodeId, kind: EventKind) -> usize {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .map_or(0, |n| n.listeners.iter().filter(|l| l.kind == kind).count())
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Deliver an event at `target`, bubbling to the root when the kind
    /// bubbles. Returns the finished event so callers can inspect it.
    pub fn dispatch(&self, target: NodeId, kind: EventKind, payload: Payload) -> Event {
        let event = Event::new(kind, target, payload);
        let path = if kind.bubbles() { self.ancestry(target) } else { vec![target] };
        debug!(%target, event = %kind, hops = path.len(), "dispatch");

        for node in path {
            let callbacks: Vec<Callback> = {
                let inner = self.inner.borrow();
                let Some(n) = inner.nodes.get(&node) else {
                    continue;
                };
                n.listeners
                    .iter()
                    .filter(|l| l.kind == kind)
                    .map(|l| Rc::clone(&l.callback))
                    .collect()
            };
            event.set_current(node);
            for callback in callbacks {
                callback(&event);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        event
    }

    /// `node` followed by each ancestor up to the root.
    fn ancestry(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut path = Vec::new();
        let mut cursor = inner.nodes.contains_key(&node).then_some(node);
        while let Some(id) = cursor {
            path.push(id);
            cursor = inner.nodes.get(&id).and_then(|n| n.parent);
        }
        path
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Detach `node` and its whole subtree.
    ///
    /// Listeners registered on removed nodes go with them, element ids are
    /// released, data sources drop their snapshot, and list views release
    /// their subscription on whatever source they were bound to.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] for the root or an unknown node.
    pub fn remove(&self, node: NodeId) -> Result<(), TreeError> {
        if node == ROOT {
            return Err(TreeError::Detached(node));
        }
        let mut removed = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            let parent = inner.nodes.get(&node).ok_or(TreeError::Detached(node))?.parent;
            if let Some(p) = parent.and_then(|p| inner.nodes.get_mut(&p)) {
                p.children.retain(|c| *c != node);
            }
            let mut stack = vec![node];
            while let Some(id) = stack.pop() {
                if let Some(n) = inner.nodes.remove(&id) {
                    if let Some(eid) = &n.element_id {
                        inner.ids.remove(eid);
                    }
                    stack.extend(n.children.iter().copied());
                    removed.push(n);
                }
            }
        }

        debug!(%node, count = removed.len(), "subtree detached");
        // Teardown runs with the arena borrow released: releasing a
        // subscription reaches back into the tree.
        for n in &removed {
            match &n.role {
                Role::DataSource(core) => core.discard(),
                Role::List(core) => core.release(),
                _ => {}
            }
        }
        drop(removed);
        Ok(())
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Listener guard. Dropping it unregisters the listener.
pub struct Subscription {
    tree: WeakTree,
    node: NodeId,
    listener: ListenerId,
}

impl Subscription {
    /// The node the listener is registered on.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("node", &self.node)
            .field("listener", &self.listener)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tree) = self.tree.upgrade() {
            tree.unlisten(self.node, self.listener);
        }
    }
}
