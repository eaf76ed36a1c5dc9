//! Text box: a named input with a get/set string value. No validation;
//! trimming is the collecting form's job.

#[cfg(test)]
#[path = "text_box_test.rs"]
mod text_box_test;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ConfigError, TreeError};
use crate::tree::{NodeId, Role, Tree};

pub const TAG: &str = "text-box";

#[derive(Default)]
pub(crate) struct FieldCore {
    name: RefCell<Option<String>>,
    placeholder: RefCell<String>,
    width: RefCell<Option<String>>,
    value: RefCell<String>,
}

impl FieldCore {
    pub(crate) fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub(crate) fn value(&self) -> String {
        self.value.borrow().clone()
    }

    pub(crate) fn set_value(&self, value: &str) {
        value.clone_into(&mut self.value.borrow_mut());
    }
}

/// Handle to a text box element.
#[derive(Clone)]
pub struct TextBox {
    node: NodeId,
    core: Rc<FieldCore>,
}

impl TextBox {
    /// Attach a text box; `name` is the key a form collects it under.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if `parent` is gone.
    pub fn attach(tree: &Tree, parent: NodeId, name: Option<&str>) -> Result<Self, TreeError> {
        let core = Rc::new(FieldCore::default());
        *core.name.borrow_mut() = name.map(str::to_owned);
        let node = tree.insert(parent, TAG, None, Role::Field(Rc::clone(&core)))?;
        super::announce(tree, node, TAG);
        Ok(Self { node, core })
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.core.name()
    }

    #[must_use]
    pub fn value(&self) -> String {
        self.core.value()
    }

    pub fn set_value(&self, value: &str) {
        self.core.set_value(value);
    }

    #[must_use]
    pub fn placeholder(&self) -> String {
        self.core.placeholder.borrow().clone()
    }

    #[must_use]
    pub fn width(&self) -> Option<String> {
        self.core.width.borrow().clone()
    }

    /// Recognizes `name`, `placeholder`, `width`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAttribute`] for anything else.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name {
            "name" => *self.core.name.borrow_mut() = Some(value.to_owned()).filter(|v| !v.is_empty()),
            "placeholder" => value.clone_into(&mut self.core.placeholder.borrow_mut()),
            "width" => *self.core.width.borrow_mut() = Some(value.to_owned()).filter(|v| !v.is_empty()),
            other => return Err(ConfigError::UnknownAttribute(other.to_owned())),
        }
        Ok(())
    }
}
