//! List view: renders one card per record of one bound data source.
//!
//! DESIGN
//! ======
//! A list view holds at most one `Binding`, and the binding owns the
//! `Subscription` on the source's `RecordsChanged`. Re-binding takes the old
//! binding out first, which drops (and so unregisters) its listener before
//! the new one is attached. Detaching the list from the tree releases the
//! binding the same way.
//!
//! Rendering is a full replace: every existing card node is removed and one
//! new card is appended per record, in snapshot order. No diffing, no keyed
//! reuse. Binding renders the source's current snapshot immediately, so a
//! source that finished loading before the list attached is not missed.

#[cfg(test)]
#[path = "list_view_test.rs"]
mod list_view_test;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::components::card::Card;
use crate::components::data_source::DataSource;
use crate::error::{ConfigError, TreeError};
use crate::event::EventKind;
use crate::record::{FieldSet, Record};
use crate::tree::{NodeId, Role, Subscription, Tree};

pub const TAG: &str = "list-view";

struct Binding {
    source: NodeId,
    _subscription: Subscription,
}

#[derive(Default)]
pub(crate) struct ListCore {
    binding: RefCell<Option<Binding>>,
    fields: RefCell<FieldSet>,
    target: RefCell<Option<String>>,
}

impl ListCore {
    /// Drop the active binding, unregistering its listener.
    pub(crate) fn release(&self) {
        let binding = self.binding.borrow_mut().take();
        drop(binding);
    }

    fn fields(&self) -> FieldSet {
        self.fields.borrow().clone()
    }
}

/// Handle to a list view element.
#[derive(Clone)]
pub struct ListView {
    tree: Tree,
    node: NodeId,
    core: Rc<ListCore>,
}

impl ListView {
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if `parent` is gone.
    pub fn attach(tree: &Tree, parent: NodeId) -> Result<Self, TreeError> {
        let core = Rc::new(ListCore::default());
        let node = tree.insert(parent, TAG, None, Role::List(Rc::clone(&core)))?;
        super::announce(tree, node, TAG);
        Ok(Self { tree: tree.clone(), node, core })
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn fields(&self) -> FieldSet {
        self.core.fields()
    }

    /// Node of the currently bound source, if any.
    #[must_use]
    pub fn bound_source(&self) -> Option<NodeId> {
        self.core.binding.borrow().as_ref().map(|b| b.source)
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    /// Bind to `source` with projection `fields`, replacing any previous
    /// binding, and render the source's current snapshot right away.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if the source has left the tree; the
    /// list is then unbound.
    pub fn bind(&self, source: &DataSource, fields: FieldSet) -> Result<(), TreeError> {
        self.core.release();
        *self.core.fields.borrow_mut() = fields;

        let weak_tree = self.tree.downgrade();
        let weak_core = Rc::downgrade(&self.core);
        let node = self.node;
        let subscription = self.tree.subscribe(source.node(), EventKind::RecordsChanged, move |event| {
            let (Some(tree), Some(core)) = (weak_tree.upgrade(), weak_core.upgrade()) else {
                return;
            };
            if let Some(records) = event.records() {
                ListView { tree, node, core }.render(records);
            }
        })?;

        *self.core.binding.borrow_mut() = Some(Binding { source: source.node(), _subscription: subscription });
        debug!(list = %self.node, source = %source.node(), fields = %self.core.fields(), "bound");
        self.render(&source.records());
        Ok(())
    }

    /// Bind to the data source registered under `element_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnresolvedSource`] if no such source exists;
    /// the previous binding is released and the list is cleared.
    pub fn bind_id(&self, element_id: &str, fields: FieldSet) -> Result<(), ConfigError> {
        *self.core.target.borrow_mut() = Some(element_id.to_owned());
        let Some(source) = self.tree.data_source(element_id) else {
            warn!(list = %self.node, target = element_id, "no data source with that id");
            *self.core.fields.borrow_mut() = fields;
            self.unbind();
            return Err(ConfigError::UnresolvedSource(element_id.to_owned()));
        };
        self.bind(&source, fields)
            .map_err(|_| ConfigError::UnresolvedSource(element_id.to_owned()))
    }

    /// Release the binding and clear rendered cards.
    pub fn unbind(&self) {
        self.core.release();
        self.render(&[]);
    }

    /// Remove the list (and its cards) from the tree, releasing the binding.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if already removed.
    pub fn detach(&self) -> Result<(), TreeError> {
        self.tree.remove(self.node)
    }

    /// Declarative configuration: `for` names a data source, `fields` is a
    /// comma-separated projection. A changed value re-binds, whether the
    /// list was bound by id or directly through [`ListView::bind`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAttribute`] for other names and
    /// [`ConfigError::UnresolvedSource`] when `for` cannot be resolved.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name {
            "for" => {
                let current = self.bound_source();
                if current.is_some() && self.tree.lookup(value) == current {
                    *self.core.target.borrow_mut() = Some(value.to_owned());
                    return Ok(());
                }
                self.bind_id(value, self.fields())
            }
            "fields" => {
                let fields = FieldSet::parse(value);
                if fields == self.fields() {
                    return Ok(());
                }
                let target = self.core.target.borrow().clone();
                if let Some(target) = target {
                    return self.bind_id(&target, fields);
                }
                // Bound directly through `bind`: rebind the same source node.
                match self.bound_source().and_then(|node| self.tree.data_source_at(node)) {
                    Some(source) => self
                        .bind(&source, fields)
                        .map_err(|_| ConfigError::UnresolvedSource(source.node().to_string())),
                    None => {
                        *self.core.fields.borrow_mut() = fields;
                        Ok(())
                    }
                }
            }
            other => Err(ConfigError::UnknownAttribute(other.to_owned())),
        }
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Replace every card with one per record, in order.
    pub fn render(&self, records: &[Record]) {
        for child in self.tree.children(self.node) {
            // Children are only ever cards appended below.
            let _ = self.tree.remove(child);
        }
        let fields = self.core.fields();
        for record in records {
            if let Err(e) = Card::new(fields.clone(), record.clone()).attach(&self.tree, self.node) {
                debug!(list = %self.node, error = %e, "render skipped: list detached");
                return;
            }
        }
        debug!(list = %self.node, cards = records.len(), "rendered");
    }

    /// Current cards in display order.
    #[must_use]
    pub fn cards(&self) -> Vec<Card> {
        self.tree
            .children(self.node)
            .into_iter()
            .filter_map(|child| match self.tree.role(child) {
                Some(Role::Card(card)) => Some(card),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards().len()
    }

    /// Text rendering: cards separated by a blank line.
    #[must_use]
    pub fn render_text(&self) -> String {
        self.cards()
            .iter()
            .map(Card::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
