//! Remote data gateway: one request kind, rows or a mutation ack back.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway is pure transport. It sends a statement (text plus positional
//! parameters) to a single endpoint and returns parsed rows or a mutation
//! acknowledgement. No caching, no retries, no timeouts.
//!
//! The trait is `?Send`: every element lives on one cooperative thread.

pub mod http;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::{Record, TableRef, Value, is_identifier};

pub use http::{GatewayConfig, HttpGateway};

// =============================================================================
// TYPES
// =============================================================================

/// Whether a statement reads rows or writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    #[default]
    Query,
    Mutation,
}

/// Statement text plus positional `?` parameters.
///
/// `kind` travels on the wire so the endpoint knows whether to answer with
/// rows or an ack; endpoints that ignore it answer with rows. Requests that
/// omit `params` or `kind` decode as a parameterless query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub kind: StatementKind,
}

impl Statement {
    #[must_use]
    pub fn query(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self { sql: sql.into(), params, kind: StatementKind::Query }
    }

    #[must_use]
    pub fn mutation(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self { sql: sql.into(), params, kind: StatementKind::Mutation }
    }

    /// `SELECT * FROM <table>`.
    #[must_use]
    pub fn select_all(table: &TableRef) -> Self {
        Self::query(format!("SELECT * FROM {table}"), Vec::new())
    }

    /// `INSERT INTO <table> (<cols>) VALUES (?, ...)` in record field order.
    ///
    /// # Errors
    ///
    /// Returns the offending name if a field is not a plain identifier.
    pub fn insert(table: &TableRef, record: &Record) -> Result<Self, String> {
        if record.is_empty() {
            return Ok(Self::mutation(format!("INSERT INTO {table} DEFAULT VALUES"), Vec::new()));
        }
        if let Some(bad) = record.fields().find(|f| !is_identifier(f)) {
            return Err(bad.to_owned());
        }
        let columns: Vec<&str> = record.fields().collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!("INSERT INTO {table} ({}) VALUES ({placeholders})", columns.join(", "));
        let params = record.iter().map(|(_, v)| v.clone()).collect();
        Ok(Self::mutation(sql, params))
    }
}

/// Acknowledgement for a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationAck {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// What came back for a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Rows(Vec<Record>),
    Ack(MutationAck),
}

/// Transport-level failure.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The endpoint could not be reached.
    #[error("request failed: {0}")]
    Request(String),
    /// The endpoint answered with a non-success status.
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },
    /// The response body was not in the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),
}

// =============================================================================
// TRAIT
// =============================================================================

/// Opaque request/response transport over the remote store.
#[async_trait(?Send)]
pub trait Gateway {
    /// Send one statement.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] for unreachable endpoints, non-success
    /// statuses, or malformed bodies.
    async fn send(&self, statement: Statement) -> Result<Response, GatewayError>;
}

/// Run a query and insist on rows.
///
/// # Errors
///
/// Propagates transport failures; an ack in place of rows is a parse failure.
pub async fn fetch_rows(gateway: &dyn Gateway, statement: Statement) -> Result<Vec<Record>, GatewayError> {
    match gateway.send(statement).await? {
        Response::Rows(rows) => Ok(rows),
        Response::Ack(_) => Err(GatewayError::Parse("expected rows, got mutation ack".into())),
    }
}

/// Run a mutation and insist on an ack.
///
/// # Errors
///
/// Propagates transport failures; rows in place of an ack are a parse failure.
pub async fn mutate(gateway: &dyn Gateway, statement: Statement) -> Result<MutationAck, GatewayError> {
    match gateway.send(statement).await? {
        Response::Ack(ack) => Ok(ack),
        Response::Rows(_) => Err(GatewayError::Parse("expected mutation ack, got rows".into())),
    }
}
