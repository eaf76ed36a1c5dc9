//! HTTP gateway: `POST {sql, params, kind}` as JSON to one endpoint.
//!
//! Thin `reqwest` wrapper. Pure parsing in `parse_response` for testability.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use async_trait::async_trait;
use serde_json::Value as Json;
use tracing::debug;

use super::{Gateway, GatewayError, MutationAck, Response, Statement, StatementKind};
use crate::record::Record;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/query";

// =============================================================================
// CONFIG
// =============================================================================

/// Gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub endpoint: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_owned() }
    }
}

impl GatewayConfig {
    /// Read `DATABIND_ENDPOINT`, falling back to [`DEFAULT_ENDPOINT`].
    #[must_use]
    pub fn from_env() -> Self {
        let endpoint = std::env::var("DATABIND_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        Self { endpoint }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpGateway {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns [`GatewayError::Request`] if the HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        Ok(Self { http, endpoint: config.endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl Gateway for HttpGateway {
    async fn send(&self, statement: Statement) -> Result<Response, GatewayError> {
        debug!(endpoint = %self.endpoint, sql = %statement.sql, params = statement.params.len(), "gateway request");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&statement)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("");
            let body = text.trim();
            let message = if body.is_empty() { reason.to_owned() } else { body.to_owned() };
            return Err(GatewayError::Status { status: status.as_u16(), message });
        }

        parse_response(statement.kind, &text)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a success body for a statement of `kind`.
///
/// Queries expect an array of row objects; `null` or an empty body means
/// no rows. Mutations accept an ack object, and also tolerate endpoints
/// that answer writes with an (empty) row array.
///
/// # Errors
///
/// Returns [`GatewayError::Parse`] if the body does not fit either shape.
pub fn parse_response(kind: StatementKind, body: &str) -> Result<Response, GatewayError> {
    if body.trim().is_empty() {
        return Ok(match kind {
            StatementKind::Query => Response::Rows(Vec::new()),
            StatementKind::Mutation => Response::Ack(MutationAck::default()),
        });
    }

    match kind {
        // Rows go straight from text to `Record` so column order survives.
        StatementKind::Query => {
            let rows: Option<Vec<Record>> = serde_json::from_str(body).map_err(|e| GatewayError::Parse(e.to_string()))?;
            Ok(Response::Rows(rows.unwrap_or_default()))
        }
        StatementKind::Mutation => match serde_json::from_str::<Json>(body).map_err(|e| GatewayError::Parse(e.to_string()))? {
            Json::Null | Json::Array(_) => Ok(Response::Ack(MutationAck::default())),
            ack @ Json::Object(_) => {
                let ack: MutationAck = serde_json::from_value(ack).map_err(|e| GatewayError::Parse(e.to_string()))?;
                Ok(Response::Ack(ack))
            }
            other => Err(GatewayError::Parse(format!("unexpected response body: {other}"))),
        },
    }
}
