//! Record model shared by every bound element.
//!
//! DESIGN
//! ======
//! A `Record` is an ordered map from field name to scalar `Value`. Shape is
//! implicit: it is whatever columns the gateway returned, or whatever named
//! inputs a form collected. The only shape checks live at the gateway
//! boundary: `TableRef` validates identifiers before they are spliced into
//! statement text, and an optional declared `FieldSet` on a data source
//! rejects undeclared columns on insert.

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// VALUE
// =============================================================================

/// Scalar cell value. Serialized as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// True for `Null` and whitespace-only text. Numbers are never blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Integer(_) | Self::Real(_) => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Real(n)
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// One row: field name to value, in column (or collection) order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Replacing keeps the original position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builder form of [`Record::insert`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Display text for a field; absent fields render as the empty string.
    #[must_use]
    pub fn display(&self, field: &str) -> String {
        self.0.get(field).map(ToString::to_string).unwrap_or_default()
    }

    /// A field counts as empty when it is absent or blank.
    #[must_use]
    pub fn is_empty_field(&self, field: &str) -> bool {
        self.0.get(field).is_none_or(Value::is_blank)
    }

    /// True when every value is blank (or there are no fields at all).
    #[must_use]
    pub fn all_blank(&self) -> bool {
        self.0.values().all(Value::is_blank)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Read-only view of a data source's rows at one point in time.
///
/// Cloning is cheap and never copies rows. Consumers cannot mutate the
/// rows in place; the owning data source replaces the whole snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot(Rc<[Record]>);

impl Snapshot {
    #[must_use]
    pub fn new(rows: Vec<Record>) -> Self {
        Self(rows.into())
    }

    /// True when both handles point at the same underlying rows.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Snapshot {
    type Target = [Record];

    fn deref(&self) -> &[Record] {
        &self.0
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

// =============================================================================
// TABLE REFERENCE
// =============================================================================

/// Validated table identifier. Safe to splice into statement text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef(String);

impl TableRef {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] unless `name` matches
    /// `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let name = name.trim();
        if is_identifier(name) {
            Ok(Self(name.to_owned()))
        } else {
            Err(ConfigError::InvalidIdentifier(name.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// FIELD SET
// =============================================================================

/// Ordered, de-duplicated list of field names.
///
/// Serves as a list projection, a form's required-field rule, and a
/// declared table schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSet(Rc<[String]>);

impl FieldSet {
    /// Parse comma-separated attribute text. Whitespace is trimmed and
    /// blank entries dropped; the first occurrence of a name wins.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.split(',').collect()
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in this set whose value in `record` is empty, in set order.
    #[must_use]
    pub fn missing_in(&self, record: &Record) -> Vec<String> {
        self.iter()
            .filter(|f| record.is_empty_field(f))
            .map(str::to_owned)
            .collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut names: Vec<String> = Vec::new();
        for raw in iter {
            let name = raw.as_ref().trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
        Self(names.into())
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}
