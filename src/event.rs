//! Notifications exchanged between elements.
//!
//! `RecordsChanged` is delivered to the data source's own node only. Every
//! other kind bubbles from its target through each ancestor to the root,
//! which is how a trigger reaches the enclosing form without either side
//! holding a reference to the other.

use std::cell::Cell;
use std::fmt;

use crate::record::{Record, Snapshot};
use crate::tree::NodeId;

/// Notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Primitive activation (a press). Intercepted by the trigger element.
    Activate,
    /// Semantic "submit intent"; no payload.
    Trigger,
    /// A data source replaced its snapshot; carries the new snapshot.
    RecordsChanged,
    /// A form submitted a record; carries the record.
    Submit,
    /// A form rejected or failed a submission; carries the message.
    Error,
    /// Emitted once by each element when attached.
    Initialized,
}

impl EventKind {
    #[must_use]
    pub fn bubbles(self) -> bool {
        !matches!(self, Self::RecordsChanged)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Trigger => "trigger",
            Self::RecordsChanged => "records-changed",
            Self::Submit => "submit",
            Self::Error => "error",
            Self::Initialized => "initialized",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,
    Records(Snapshot),
    Record(Record),
    Message(String),
}

/// A notification in flight.
#[derive(Debug)]
pub struct Event {
    kind: EventKind,
    target: NodeId,
    current: Cell<NodeId>,
    payload: Payload,
    stopped: Cell<bool>,
}

impl Event {
    pub(crate) fn new(kind: EventKind, target: NodeId, payload: Payload) -> Self {
        Self { kind, target, current: Cell::new(target), payload, stopped: Cell::new(false) }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The node the event was dispatched at.
    #[must_use]
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The node whose listeners are currently running.
    #[must_use]
    pub fn current(&self) -> NodeId {
        self.current.get()
    }

    pub(crate) fn set_current(&self, node: NodeId) {
        self.current.set(node);
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub fn records(&self) -> Option<&Snapshot> {
        match &self.payload {
            Payload::Records(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match &self.payload {
            Payload::Record(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match &self.payload {
            Payload::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Stop after the listeners on the current node finish.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}
