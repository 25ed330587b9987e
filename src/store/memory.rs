//! In-memory [`DocumentStore`] backed by a [`Schema`].
//!
//! Writes behave like a schema-driven index:
//!
//! - fields that are not `stored` are dropped, so they cannot be read back
//!   (and therefore do not survive a merge);
//! - copy-field rules are applied, adding the source values to each target;
//! - a single-valued field that ends up with more than one value is rejected.
//!
//! Every write gets a fresh internal doc id. Replacing a document moves it
//! to the end of the result order, as a segment-based index would.
//!
//! Writes are visible immediately; there is no separate commit step.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::data::{DataValue, Document};
use crate::error::{DocMergeError, Result};
use crate::processor::{AddCommand, DeleteCommand, UpdateSink};
use crate::schema::Schema;
use crate::store::query::StoreQuery;
use crate::store::{DocumentStore, StoredFields, StoredHit};

#[derive(Debug, Default)]
struct MemoryInner {
    docs: BTreeMap<u64, StoredHit>,
    ids: HashMap<String, u64>,
    next_doc_id: u64,
}

impl MemoryInner {
    fn remove(&mut self, id: &str) -> bool {
        match self.ids.remove(id) {
            Some(doc_id) => self.docs.remove(&doc_id).is_some(),
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct MemoryDocumentStore {
    schema: Arc<Schema>,
    inner: RwLock<MemoryInner>,
}

impl MemoryDocumentStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            inner: RwLock::new(MemoryInner::default()),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored fields of the document with identifier `id`.
    pub fn get_by_id(&self, id: &str) -> Option<StoredFields> {
        let inner = self.inner.read();
        inner
            .ids
            .get(id)
            .and_then(|doc_id| inner.docs.get(doc_id))
            .map(|hit| hit.fields.clone())
    }

    /// Identifiers of all live documents in result order.
    pub fn ids(&self) -> Vec<String> {
        self.inner
            .read()
            .docs
            .values()
            .map(|hit| hit.id.clone())
            .collect()
    }

    /// Remove a whole document. Returns whether it existed.
    pub fn delete_by_id(&self, id: &str) -> bool {
        self.inner.write().remove(id)
    }

    /// Remove every document matching `expression`. Returns how many were removed.
    pub fn delete_by_query(&self, expression: &str) -> Result<usize> {
        let query = StoreQuery::parse(expression)?;
        let mut inner = self.inner.write();

        let matched: Vec<String> = inner
            .docs
            .values()
            .filter(|hit| query.matches(&hit.fields))
            .map(|hit| hit.id.clone())
            .collect();

        for id in &matched {
            inner.remove(id);
        }

        Ok(matched.len())
    }

    /// Convert a document into the instances this store keeps for it.
    fn to_stored_fields(&self, document: &Document) -> Result<StoredFields> {
        let key = self.schema.unique_key.as_str();

        let mut names = document.field_names();
        names.sort_by_key(|name| *name != key);

        let mut instances: Vec<(String, DataValue)> = Vec::new();
        let mut copies: Vec<(String, DataValue)> = Vec::new();

        for name in names {
            let Some(value) = document.get(name) else {
                continue;
            };
            self.schema.field(name)?;

            for v in value.values() {
                instances.push((name.to_string(), v.clone()));
            }
            for dest in self.schema.copy_targets_for(name) {
                for v in value.values() {
                    copies.push((dest.to_string(), v.clone()));
                }
            }
        }
        instances.extend(copies);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (name, _) in &instances {
            *counts.entry(name.as_str()).or_default() += 1;
        }
        for (name, count) in counts {
            if count > 1 && !self.schema.field(name)?.multi_valued {
                return Err(DocMergeError::write(format!(
                    "multiple values encountered for non multi-valued field '{name}'"
                )));
            }
        }

        let mut stored = StoredFields::new();
        for (name, value) in instances {
            if self.schema.field(&name)?.stored {
                stored.push(name, value);
            }
        }
        Ok(stored)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, field: &str, value: &str) -> Result<Option<StoredFields>> {
        if field == self.schema.unique_key {
            return Ok(self.get_by_id(value));
        }

        let inner = self.inner.read();
        Ok(inner
            .docs
            .values()
            .find(|hit| hit.fields.has_term(field, value))
            .map(|hit| hit.fields.clone()))
    }

    fn query(&self, expression: &str) -> Result<Vec<StoredHit>> {
        let query = StoreQuery::parse(expression)?;
        let inner = self.inner.read();
        Ok(inner
            .docs
            .values()
            .filter(|hit| query.matches(&hit.fields))
            .cloned()
            .collect())
    }

    fn write(&self, document: Document) -> Result<()> {
        let id = document.unique_key(&self.schema.unique_key)?;
        let fields = self.to_stored_fields(&document)?;

        let mut inner = self.inner.write();
        inner.remove(&id);
        let doc_id = inner.next_doc_id;
        inner.next_doc_id += 1;
        inner.docs.insert(
            doc_id,
            StoredHit {
                id: id.clone(),
                fields,
            },
        );
        inner.ids.insert(id, doc_id);
        Ok(())
    }
}

/// Terminal stage of an update chain: adds are written, deletes remove
/// whole documents.
impl UpdateSink for MemoryDocumentStore {
    fn process_add(&self, command: AddCommand) -> Result<()> {
        self.write(command.document)
    }

    fn process_delete(&self, command: DeleteCommand) -> Result<()> {
        if let Some(id) = &command.id {
            let existed = self.delete_by_id(id);
            debug!("memory store: delete id={id} existed={existed}");
        }
        if let Some(query) = &command.query {
            let removed = self.delete_by_query(query)?;
            debug!("memory store: delete query={query} removed={removed}");
        }
        Ok(())
    }
}
