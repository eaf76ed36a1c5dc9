//! `POST /query`: run one statement against the database.
//!
//! ERROR HANDLING
//! ==============
//! A body that does not decode as a statement is a 400 with the decoder's
//! message. Any database failure is a 500 with the database's message. Both
//! bodies are plain text so clients can surface them verbatim.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use databind::Statement;
use tracing::{debug, info, warn};

use crate::db::{self, Outcome};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("{0}")]
    BadRequest(#[from] serde_json::Error),
    #[error("{0}")]
    Database(#[from] sqlx::Error),
}

impl QueryError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "query failed");
        (status, self.to_string()).into_response()
    }
}

/// Queries answer with an array of row objects, or `null` when nothing
/// matched. Mutations answer with `{"rowsAffected", "lastInsertId"}`.
pub async fn query(State(state): State<AppState>, body: Bytes) -> Result<Response, QueryError> {
    debug!(body = %String::from_utf8_lossy(&body), "query request");
    let statement: Statement = serde_json::from_slice(&body)?;
    info!(kind = ?statement.kind, params = statement.params.len(), "executing statement");

    let response = match db::execute(&state.pool, &statement).await? {
        Outcome::Rows(rows) => {
            debug!(rows = rows.len(), "query response");
            let body = (!rows.is_empty()).then_some(rows);
            Json(body).into_response()
        }
        Outcome::Ack(ack) => {
            debug!(rows_affected = ack.rows_affected, last_insert_id = ?ack.last_insert_id, "mutation response");
            Json(ack).into_response()
        }
    };
    Ok(response)
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
