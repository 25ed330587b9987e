//! Resolving existing documents for the merge stage.

use std::sync::Arc;

use log::debug;

use crate::data::Document;
use crate::error::Result;
use crate::schema::FieldSchema;
use crate::store::{DocumentStore, StoredFields};

/// Rebuild a mergeable [`Document`] from a store-native one.
///
/// Repeated instances of a field become a multi-valued field, in stored
/// order. Copy-field targets are skipped: they are recomputed when the
/// merged document is written. Every stored field must resolve against the
/// schema.
pub fn to_stored_document(fields: &StoredFields, schema: &dyn FieldSchema) -> Result<Document> {
    let mut document = Document::new();
    for (name, value) in fields.iter() {
        if !schema.is_copy_field_target(name)? {
            document.add_field(name, value.clone());
        }
    }
    Ok(document)
}

/// Looks up existing documents by identifier or query.
pub struct Lookup {
    store: Arc<dyn DocumentStore>,
    schema: Arc<dyn FieldSchema>,
}

impl Lookup {
    pub fn new(store: Arc<dyn DocumentStore>, schema: Arc<dyn FieldSchema>) -> Self {
        Self { store, schema }
    }

    /// Find the document whose unique key equals `id`.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        debug!("lookup: searching for existing document({id})");
        match self.store.get(self.schema.unique_key_field(), id)? {
            Some(fields) => Ok(Some(to_stored_document(&fields, self.schema.as_ref())?)),
            None => Ok(None),
        }
    }

    /// All documents matching `expression`, in store order, paired with
    /// their identifiers.
    ///
    /// Every match is rebuilt before returning, so a failure here happens
    /// before any write.
    pub fn find_by_query(&self, expression: &str) -> Result<Vec<(String, Document)>> {
        debug!("lookup: searching for existing documents({expression})");
        self.store
            .query(expression)?
            .into_iter()
            .map(|hit| {
                let document = to_stored_document(&hit.fields, self.schema.as_ref())?;
                Ok((hit.id, document))
            })
            .collect()
    }
}
