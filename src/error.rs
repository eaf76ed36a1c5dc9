//! Error taxonomy for the binding layer.
//!
//! ERROR HANDLING
//! ==============
//! Three failure families cross element boundaries:
//! - transport: the gateway was unreachable or answered non-success.
//! - validation: missing required fields, empty records, undeclared columns.
//! - configuration: unresolved references, bad identifiers, missing markup.
//!
//! Transport failures during a user-triggered write surface as an "error"
//! outcome. Transport failures during background reloads are logged only.
//! Configuration failures are logged and abort quietly unless a form opts in
//! to surfacing them.

use crate::gateway::GatewayError;
use crate::tree::NodeId;

/// Bad attribute value or unresolvable reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("no data source with id {0:?}")]
    UnresolvedSource(String),
    #[error("no `for` reference configured")]
    MissingTarget,
    #[error("no named fields found in form")]
    NoFields,
    #[error("no table bound to data source")]
    NoTable,
}

/// Failures from element tree bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("duplicate element id {0:?}")]
    DuplicateId(String),
    #[error("node {0} is not attached")]
    Detached(NodeId),
}

/// Failures surfaced by data source operations.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error(transparent)]
    Transport(#[from] GatewayError),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
