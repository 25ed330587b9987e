//! The document store the merge stage reads from and writes to.
//!
//! Stores hand back documents in their native shape, [`StoredFields`]: a
//! flat, ordered list of field instances in which a multi-valued field
//! appears once per value and copy-field targets are included. Turning that
//! into a mergeable [`Document`] is done by [`crate::lookup`].

pub mod memory;
pub mod query;

use crate::data::{DataValue, Document};
use crate::error::Result;

/// Store-native representation of one stored document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredFields {
    fields: Vec<(String, DataValue)>,
}

impl StoredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field instance.
    pub fn push(&mut self, name: impl Into<String>, value: DataValue) {
        self.fields.push((name.into(), value));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.push(name, value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// All instances of `name`, in stored order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DataValue> + 'a {
        self.fields
            .iter()
            .filter(move |(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    /// Whether any instance of `name` has exactly the term `term`.
    pub fn has_term(&self, name: &str, term: &str) -> bool {
        self.values(name)
            .any(|value| value.as_term().as_deref() == Some(term))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One document matched by a store query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHit {
    /// The document's unique identifier.
    pub id: String,
    pub fields: StoredFields,
}

/// Read/write access to the underlying index.
///
/// Reads and writes are ordinary blocking calls. Implementations decide
/// their own visibility and commit rules; the merge stage takes no locks
/// across a read and the write that follows it.
pub trait DocumentStore: Send + Sync {
    /// Exact-term lookup returning at most one document.
    ///
    /// When several documents match, the first in the store's order wins.
    fn get(&self, field: &str, value: &str) -> Result<Option<StoredFields>>;

    /// Execute a query expression in the store's own syntax.
    ///
    /// Hits are returned in the store's native result order.
    fn query(&self, expression: &str) -> Result<Vec<StoredHit>>;

    /// Insert or replace a document, keyed by its unique identifier.
    fn write(&self, document: Document) -> Result<()>;
}
