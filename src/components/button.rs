//! Button: turns a press into a bubbling `Trigger`.
//!
//! The raw `Activate` is stopped at the button so ancestors never see it;
//! only the payload-free `Trigger` continues upward.

#[cfg(test)]
#[path = "button_test.rs"]
mod button_test;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::error::{ConfigError, TreeError};
use crate::event::{EventKind, Payload};
use crate::tree::{NodeId, Role, Tree};

pub const TAG: &str = "app-button";
pub const DEFAULT_LABEL: &str = "Click Me";

pub(crate) struct TriggerCore {
    label: RefCell<String>,
}

/// Handle to a button element.
#[derive(Clone)]
pub struct Button {
    tree: Tree,
    node: NodeId,
    core: Rc<TriggerCore>,
}

impl Button {
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if `parent` is gone.
    pub fn attach(tree: &Tree, parent: NodeId, label: Option<&str>) -> Result<Self, TreeError> {
        let core = Rc::new(TriggerCore { label: RefCell::new(label.unwrap_or(DEFAULT_LABEL).to_owned()) });
        let node = tree.insert(parent, TAG, None, Role::Trigger(Rc::clone(&core)))?;

        let weak = tree.downgrade();
        tree.listen(node, EventKind::Activate, move |event| {
            if event.target() != node {
                return;
            }
            event.stop_propagation();
            if let Some(tree) = weak.upgrade() {
                debug!(button = %node, "trigger");
                tree.dispatch(node, EventKind::Trigger, Payload::None);
            }
        })?;

        super::announce(tree, node, TAG);
        Ok(Self { tree: tree.clone(), node, core })
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.core.label.borrow().clone()
    }

    /// Primitive activation. A form handling the resulting trigger spawns
    /// its submission on the current `LocalSet`.
    pub fn press(&self) {
        self.tree.dispatch(self.node, EventKind::Activate, Payload::None);
    }

    /// Recognizes `label`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAttribute`] for anything else.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name {
            "label" => value.clone_into(&mut self.core.label.borrow_mut()),
            other => return Err(ConfigError::UnknownAttribute(other.to_owned())),
        }
        Ok(())
    }
}
