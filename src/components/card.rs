//! Card: read-only display of one record through a projection.

#[cfg(test)]
#[path = "card_test.rs"]
mod card_test;

use crate::error::TreeError;
use crate::record::{FieldSet, Record};
use crate::tree::{NodeId, Role, Tree};

pub const TAG: &str = "list-card";

/// One rendered record. Equality is structural over (projection, record).
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    fields: FieldSet,
    record: Record,
}

impl Card {
    #[must_use]
    pub fn new(fields: FieldSet, record: Record) -> Self {
        Self { fields, record }
    }

    /// Replace the pair; the rendered output follows entirely.
    pub fn set(&mut self, fields: FieldSet, record: Record) {
        self.fields = fields;
        self.record = record;
    }

    #[must_use]
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// One line per projected field, in projection order. Missing fields
    /// render as empty lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.fields.iter().map(|f| self.record.display(f)).collect()
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    pub(crate) fn attach(self, tree: &Tree, parent: NodeId) -> Result<NodeId, TreeError> {
        tree.insert(parent, TAG, None, Role::Card(self))
    }
}
