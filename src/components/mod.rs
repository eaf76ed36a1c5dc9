//! Bound elements.
//!
//! Leaves first: `card`, `text_box`, `button` are presentation and input
//! leaves; `data_source` owns a table snapshot; `list_view` renders one
//! source; `form` orchestrates inputs, a trigger, and a source.

pub mod button;
pub mod card;
pub mod data_source;
pub mod form;
pub mod list_view;
pub mod text_box;

use crate::event::{EventKind, Payload};
use crate::tree::{NodeId, Tree};

/// Emit the one-time `Initialized` notification for a freshly attached element.
fn announce(tree: &Tree, node: NodeId, tag: &str) {
    tree.dispatch(node, EventKind::Initialized, Payload::Message(format!("{tag} initialized")));
}
