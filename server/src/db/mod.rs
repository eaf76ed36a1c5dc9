//! SQLite pool and statement execution.
//!
//! SYSTEM CONTEXT
//! ==============
//! `/query` hands every decoded statement to [`execute`]. Queries come back as
//! records in column order; mutations come back as an ack. Parameters are
//! always bound, never spliced into the statement text.

use databind::{MutationAck, Record, Statement, StatementKind, Value};
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Decode, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(Vec<Record>),
    Ack(MutationAck),
}

/// Open the SQLite pool, creating the database file when the URL allows it.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run one statement with its positional parameters bound.
///
/// # Errors
///
/// Returns the database error for invalid SQL, missing tables, constraint
/// violations, or values that cannot be decoded.
pub async fn execute(pool: &SqlitePool, statement: &Statement) -> Result<Outcome, sqlx::Error> {
    let query = bind_all(sqlx::query(&statement.sql), &statement.params);
    match statement.kind {
        StatementKind::Query => {
            let rows = query.fetch_all(pool).await?;
            let records = rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()?;
            Ok(Outcome::Rows(records))
        }
        StatementKind::Mutation => {
            let done = query.execute(pool).await?;
            Ok(Outcome::Ack(MutationAck {
                rows_affected: done.rows_affected(),
                last_insert_id: Some(done.last_insert_rowid()),
            }))
        }
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_all<'q>(mut query: SqliteQuery<'q>, params: &[Value]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Integer(n) => query.bind(*n),
            Value::Real(n) => query.bind(*n),
            Value::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

/// Decode by storage class. BLOBs become lossy UTF-8 text.
fn row_to_record(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_owned();
            match storage.as_str() {
                "INTEGER" => Value::Integer(decode::<i64>(raw)?),
                "REAL" => Value::Real(decode::<f64>(raw)?),
                "BLOB" => Value::Text(String::from_utf8_lossy(&decode::<Vec<u8>>(raw)?).into_owned()),
                _ => Value::Text(decode::<String>(raw)?),
            }
        };
        record.insert(column.name(), value);
    }
    Ok(record)
}

fn decode<'r, T: Decode<'r, Sqlite>>(raw: sqlx::sqlite::SqliteValueRef<'r>) -> Result<T, sqlx::Error> {
    T::decode(raw).map_err(sqlx::Error::Decode)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
