//! Shared fixtures: a scripted in-memory gateway and event capture.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::event::{EventKind, Payload};
use crate::gateway::{Gateway, GatewayError, MutationAck, Response, Statement, StatementKind};
use crate::record::Record;
use crate::tree::{NodeId, Tree};

enum Step {
    Fail { status: u16, message: String },
    Hold(oneshot::Receiver<()>),
}

/// In-memory store that understands the two statements the elements issue.
///
/// Responses are computed when the request arrives; a held request only
/// delays delivery, like a slow network.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    tables: RefCell<HashMap<String, Vec<Record>>>,
    script: RefCell<VecDeque<Step>>,
    sent: RefCell<Vec<Statement>>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn seed(&self, table: &str, rows: Vec<Record>) {
        self.tables.borrow_mut().insert(table.to_owned(), rows);
    }

    pub(crate) fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    /// Fail the next request with a non-success status.
    pub(crate) fn fail_next(&self, status: u16, message: &str) {
        self.script
            .borrow_mut()
            .push_back(Step::Fail { status, message: message.to_owned() });
    }

    /// Hold the next request's response until the returned sender fires.
    pub(crate) fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.borrow_mut().push_back(Step::Hold(rx));
        tx
    }

    pub(crate) fn sent(&self) -> Vec<Statement> {
        self.sent.borrow().clone()
    }

    pub(crate) fn count(&self, kind: StatementKind) -> usize {
        self.sent.borrow().iter().filter(|s| s.kind == kind).count()
    }

    fn apply(&self, statement: &Statement) -> Result<Response, GatewayError> {
        let sql = statement.sql.as_str();
        if let Some(table) = sql.strip_prefix("SELECT * FROM ") {
            return self
                .tables
                .borrow()
                .get(table)
                .map(|rows| Response::Rows(rows.clone()))
                .ok_or_else(|| no_such_table(table));
        }
        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (table, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            let record: Record = if tail == "DEFAULT VALUES" {
                Record::new()
            } else {
                let columns = tail
                    .trim_start_matches('(')
                    .split_once(')')
                    .map_or("", |(cols, _)| cols);
                columns.split(", ").zip(statement.params.iter().cloned()).collect()
            };
            let mut tables = self.tables.borrow_mut();
            let rows = tables.get_mut(table).ok_or_else(|| no_such_table(table))?;
            rows.push(record);
            let id = i64::try_from(rows.len()).unwrap_or(i64::MAX);
            return Ok(Response::Ack(MutationAck { rows_affected: 1, last_insert_id: Some(id) }));
        }
        Err(GatewayError::Status { status: 400, message: format!("unsupported statement: {sql}") })
    }
}

fn no_such_table(table: &str) -> GatewayError {
    GatewayError::Status { status: 500, message: format!("no such table: {table}") }
}

#[async_trait(?Send)]
impl Gateway for ScriptedGateway {
    async fn send(&self, statement: Statement) -> Result<Response, GatewayError> {
        self.sent.borrow_mut().push(statement.clone());
        let step = self.script.borrow_mut().pop_front();
        let (result, gate) = match step {
            Some(Step::Fail { status, message }) => (Err(GatewayError::Status { status, message }), None),
            Some(Step::Hold(rx)) => (self.apply(&statement), Some(rx)),
            None => (self.apply(&statement), None),
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub(crate) fn book(title: &str, author: &str) -> Record {
    Record::new().with("title", title).with("author", author)
}

/// Gateway with a two-row `books` table and an empty `authors` table.
pub(crate) fn library() -> Rc<ScriptedGateway> {
    let gw = ScriptedGateway::new();
    gw.seed("books", vec![book("Dune", "Herbert"), book("Emma", "Austen")]);
    gw.seed("authors", Vec::new());
    gw
}

/// Run `fut` inside a `LocalSet` so elements can spawn local work.
pub(crate) async fn local<F: Future>(fut: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(fut).await
}

/// Record every `kind` payload that reaches `node`.
pub(crate) fn capture(tree: &Tree, node: NodeId, kind: EventKind) -> Rc<RefCell<Vec<Payload>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    tree.listen(node, kind, move |event| sink.borrow_mut().push(event.payload().clone()))
        .expect("capture node should be attached");
    seen
}
