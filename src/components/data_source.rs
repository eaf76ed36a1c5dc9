//! Data source: one table reference, one in-memory snapshot.
//!
//! DESIGN
//! ======
//! The snapshot starts empty, is replaced wholesale by each applied load,
//! and is discarded when the element leaves the tree. Every applied load
//! emits `RecordsChanged` at the source's node carrying the new snapshot.
//!
//! Loads are not cancellable. Instead each load takes a sequence number at
//! issue time, and a finished load is applied only if it is newer than the
//! last applied one and the table it read is still the bound table. A slow
//! superseded load therefore never overwrites fresher rows.
//!
//! ERROR HANDLING
//! ==============
//! A failed load keeps the previous snapshot, logs, and emits nothing.
//! `create_record` returns insert failures to its caller before any reload
//! is attempted; a failed reload after a successful insert is only logged.

#[cfg(test)]
#[path = "data_source_test.rs"]
mod data_source_test;

use std::cell::RefCell;
use std::rc::Rc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DataError, TreeError};
use crate::event::{EventKind, Payload};
use crate::gateway::{self, Gateway, MutationAck, Statement};
use crate::record::{FieldSet, Record, Snapshot, TableRef};
use crate::tree::{NodeId, Role, Tree};

pub const TAG: &str = "data-source";

/// Result of one `load_data` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Snapshot replaced with this many rows; `RecordsChanged` emitted.
    Applied(usize),
    /// A newer load (or a table change, or detachment) overtook this one.
    Superseded,
    /// No table bound; nothing fetched.
    Unbound,
}

pub(crate) struct SourceCore {
    gateway: Rc<dyn Gateway>,
    state: RefCell<SourceState>,
}

#[derive(Default)]
struct SourceState {
    table: Option<TableRef>,
    schema: Option<FieldSet>,
    snapshot: Snapshot,
    issued: u64,
    applied: u64,
    detached: bool,
}

impl SourceCore {
    /// Drop the snapshot and refuse further loads. Called on removal.
    pub(crate) fn discard(&self) {
        let mut state = self.state.borrow_mut();
        state.snapshot = Snapshot::default();
        state.detached = true;
    }
}

/// Handle to a data source element. Cloning shares the element.
#[derive(Clone)]
pub struct DataSource {
    tree: Tree,
    node: NodeId,
    core: Rc<SourceCore>,
}

impl DataSource {
    /// Attach a new data source under `parent`, registered as `element_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::DuplicateId`] if the id is taken, or
    /// [`TreeError::Detached`] if `parent` is gone.
    pub fn attach(tree: &Tree, parent: NodeId, element_id: &str, gateway: Rc<dyn Gateway>) -> Result<Self, TreeError> {
        let core = Rc::new(SourceCore { gateway, state: RefCell::new(SourceState::default()) });
        let node = tree.insert(parent, TAG, Some(element_id), Role::DataSource(Rc::clone(&core)))?;
        super::announce(tree, node, TAG);
        Ok(Self::from_parts(tree.clone(), node, core))
    }

    pub(crate) fn from_parts(tree: Tree, node: NodeId, core: Rc<SourceCore>) -> Self {
        Self { tree, node, core }
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn table(&self) -> Option<TableRef> {
        self.core.state.borrow().table.clone()
    }

    /// Current snapshot. Never fetches.
    #[must_use]
    pub fn records(&self) -> Snapshot {
        self.core.state.borrow().snapshot.clone()
    }

    /// Declare the table's columns. Inserts carrying other fields are rejected.
    pub fn set_schema(&self, schema: Option<FieldSet>) {
        self.core.state.borrow_mut().schema = schema;
    }

    /// Rebind to `table`. A changed table triggers exactly one reload,
    /// spawned on the current `LocalSet`; its handle is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for a malformed name; the
    /// previous binding stays in place.
    pub fn set_table(&self, table: &str) -> Result<Option<JoinHandle<()>>, ConfigError> {
        let table = TableRef::parse(table)?;
        {
            let mut state = self.core.state.borrow_mut();
            if state.table.as_ref() == Some(&table) {
                return Ok(None);
            }
            info!(source = %self.node, %table, "table changed");
            state.table = Some(table);
        }
        Ok(Some(self.spawn_reload()))
    }

    /// Declarative configuration. Recognizes `table`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAttribute`] for anything else.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<Option<JoinHandle<()>>, ConfigError> {
        match name {
            "table" => self.set_table(value),
            other => Err(ConfigError::UnknownAttribute(other.to_owned())),
        }
    }

    fn spawn_reload(&self) -> JoinHandle<()> {
        let source = self.clone();
        tokio::task::spawn_local(async move {
            // Failures are logged inside load_data; nobody is waiting here.
            let _ = source.load_data().await;
        })
    }

    /// Fetch every row of the bound table and, if still current, replace the
    /// snapshot and emit `RecordsChanged`.
    ///
    /// # Errors
    ///
    /// Returns the transport failure; the snapshot is left unchanged.
    pub async fn load_data(&self) -> Result<LoadOutcome, DataError> {
        let (table, seq) = {
            let mut state = self.core.state.borrow_mut();
            let Some(table) = state.table.clone() else {
                warn!(source = %self.node, "load skipped: no table bound");
                return Ok(LoadOutcome::Unbound);
            };
            state.issued += 1;
            (table, state.issued)
        };

        debug!(source = %self.node, %table, seq, "load issued");
        let rows = match gateway::fetch_rows(self.core.gateway.as_ref(), Statement::select_all(&table)).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(source = %self.node, %table, seq, error = %e, "load failed; keeping previous snapshot");
                return Err(e.into());
            }
        };

        let snapshot = {
            let mut state = self.core.state.borrow_mut();
            if state.detached || seq <= state.applied || state.table.as_ref() != Some(&table) {
                debug!(source = %self.node, %table, seq, applied = state.applied, "stale load dropped");
                return Ok(LoadOutcome::Superseded);
            }
            state.applied = seq;
            state.snapshot = Snapshot::new(rows);
            state.snapshot.clone()
        };

        info!(source = %self.node, %table, rows = snapshot.len(), "records loaded");
        let count = snapshot.len();
        self.tree.dispatch(self.node, EventKind::RecordsChanged, Payload::Records(snapshot));
        Ok(LoadOutcome::Applied(count))
    }

    /// Insert `record` into the bound table, then reload.
    ///
    /// Returns `Ok(None)` without contacting the gateway when no table is
    /// bound.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Validation`] for undeclared or malformed field
    /// names and [`DataError::Transport`] if the insert itself fails. Reload
    /// failures are not reported here.
    pub async fn create_record(&self, record: Record) -> Result<Option<MutationAck>, DataError> {
        let (table, schema) = {
            let state = self.core.state.borrow();
            (state.table.clone(), state.schema.clone())
        };
        let Some(table) = table else {
            warn!(source = %self.node, "create ignored: no table bound");
            return Ok(None);
        };

        if let Some(schema) = schema {
            let undeclared: Vec<&str> = record.fields().filter(|f| !schema.contains(f)).collect();
            if !undeclared.is_empty() {
                return Err(DataError::Validation(format!("Undeclared fields for {table}: {}", undeclared.join(", "))));
            }
        }
        let statement = Statement::insert(&table, &record)
            .map_err(|bad| DataError::Validation(format!("Invalid field name: {bad:?}")))?;

        let ack = gateway::mutate(self.core.gateway.as_ref(), statement)
            .await
            .inspect_err(|e| warn!(source = %self.node, %table, error = %e, "insert failed"))?;
        info!(source = %self.node, %table, rows_affected = ack.rows_affected, "record created");

        if let Err(e) = self.load_data().await {
            debug!(source = %self.node, error = %e, "reload after insert failed");
        }
        Ok(Some(ack))
    }
}
