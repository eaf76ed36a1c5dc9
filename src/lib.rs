//! Declarative data-bound elements over a remote record store.
//!
//! ARCHITECTURE
//! ============
//! Elements live in a [`Tree`]. A [`DataSource`] owns a snapshot of one
//! remote table, fetched through a [`Gateway`]. A [`ListView`] subscribes to
//! one source and renders a [`Card`] per record. A [`Form`] collects its
//! [`TextBox`] inputs when a [`Button`] inside it fires a bubbling trigger,
//! and creates the record through its source:
//!
//! ```text
//! Button --trigger--> Form --create--> DataSource --gateway--> store
//!                                          |
//!                                   records-changed
//!                                          v
//!                                      ListView --> Card*
//! ```
//!
//! RUNTIME
//! =======
//! Single-threaded and cooperative. Handles are `Rc`-based and not `Send`.
//! Work that elements start on their own (a reload after a table change, a
//! submission started by a trigger) is spawned with
//! `tokio::task::spawn_local`, so those calls must run inside a
//! `tokio::task::LocalSet`.

pub mod components;
pub mod error;
pub mod event;
pub mod gateway;
pub mod record;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use components::button::Button;
pub use components::card::Card;
pub use components::data_source::{DataSource, LoadOutcome};
pub use components::form::{EmptyPolicy, Form, FormConfig, FormOutcome, FormPhase};
pub use components::list_view::ListView;
pub use components::text_box::TextBox;
pub use error::{ConfigError, DataError, TreeError};
pub use event::{Event, EventKind, Payload};
pub use gateway::{Gateway, GatewayConfig, GatewayError, HttpGateway, MutationAck, Response, Statement, StatementKind};
pub use record::{FieldSet, Record, Snapshot, TableRef, Value};
pub use tree::{NodeId, Subscription, Tree};
