//! The merge stage of an update chain.
//!
//! Update commands flow through a chain of [`UpdateSink`]s. When a request
//! enables merging, [`MergeProcessorFactory`] puts a [`MergeProcessor`] in
//! front of the next sink. The processor rewrites commands before passing
//! them on:
//!
//! - **add by id**: the existing document with the same identifier is merged
//!   with the incoming one; if there is none, the add passes through as an
//!   insert.
//! - **add with `merge.query`**: the incoming document, minus its
//!   identifier, is merged into every matching document and one add is
//!   emitted per match.
//! - **delete by id and/or query**: the configured `delete.field` fields are
//!   stripped from each matching document, which is then re-added.
//!   **A field-scoped delete never deletes a document.** With no
//!   `delete.field` the matched documents are re-added unchanged.
//!
//! # Known limitations
//!
//! Each merge is a plain read followed by a write. No lock is held in
//! between, so two concurrent merges on the same identifier race and the
//! store's commit order decides which one wins. A bulk operation that fails
//! part-way leaves the matches already processed written; nothing is rolled
//! back.

use std::sync::Arc;

use log::{debug, warn};

use crate::data::Document;
use crate::error::Result;
use crate::lookup::Lookup;
use crate::merge::{delete_fields, merge, without_unique_key};
use crate::params::{MergeConfig, Params};
use crate::schema::FieldSchema;
use crate::store::DocumentStore;

/// Add (insert or replace) a document.
#[derive(Debug, Clone, PartialEq)]
pub struct AddCommand {
    pub document: Document,
    /// The write replaces any uncommitted version of the same document.
    pub overwrite_committed: bool,
}

impl AddCommand {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            overwrite_committed: false,
        }
    }

    /// Command for a document rebuilt by the merge stage.
    pub fn for_merged(document: Document) -> Self {
        Self {
            document,
            overwrite_committed: true,
        }
    }
}

/// Delete by identifier, by query, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteCommand {
    pub id: Option<String>,
    pub query: Option<String>,
}

impl DeleteCommand {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            query: None,
        }
    }

    pub fn by_query(query: impl Into<String>) -> Self {
        Self {
            id: None,
            query: Some(query.into()),
        }
    }
}

/// A stage in an update chain.
pub trait UpdateSink: Send + Sync {
    fn process_add(&self, command: AddCommand) -> Result<()>;

    fn process_delete(&self, command: DeleteCommand) -> Result<()>;
}

pub struct MergeProcessorFactory;

impl MergeProcessorFactory {
    /// Build the merge stage for one request.
    ///
    /// Returns `next` itself when the request does not enable `merge`.
    pub fn create(
        params: &Params,
        schema: Arc<dyn FieldSchema>,
        store: Arc<dyn DocumentStore>,
        next: Arc<dyn UpdateSink>,
    ) -> Result<Arc<dyn UpdateSink>> {
        let config = MergeConfig::from_params(params)?;
        if !config.enabled {
            return Ok(next);
        }
        Ok(Arc::new(MergeProcessor::new(config, schema, store, next)?))
    }
}

/// Rewrites adds and deletes into merged re-adds. See the module docs.
pub struct MergeProcessor {
    config: MergeConfig,
    schema: Arc<dyn FieldSchema>,
    lookup: Lookup,
    next: Arc<dyn UpdateSink>,
}

impl MergeProcessor {
    /// Fails with [`crate::DocMergeError::UnknownField`] when a
    /// `delete.field` name has no schema entry. Empty names are skipped.
    pub fn new(
        mut config: MergeConfig,
        schema: Arc<dyn FieldSchema>,
        store: Arc<dyn DocumentStore>,
        next: Arc<dyn UpdateSink>,
    ) -> Result<Self> {
        resolve_fields(
            schema.as_ref(),
            config.delete_fields.iter().map(String::as_str),
        )?;

        let key = schema.unique_key_field().to_string();
        if config.delete_fields.iter().any(|f| *f == key) {
            warn!("merge: ignoring unique key '{key}' in delete fields");
            config.delete_fields.retain(|f| *f != key);
        }

        Ok(Self {
            config,
            lookup: Lookup::new(store, schema.clone()),
            schema,
            next,
        })
    }

    fn add_by_id(&self, command: AddCommand) -> Result<()> {
        let id = command
            .document
            .unique_key(self.schema.unique_key_field())?;
        debug!("merge: add {id}");
        resolve_fields(self.schema.as_ref(), command.document.field_names())?;

        let command = match self.lookup.find_by_id(&id)? {
            Some(existing) => {
                debug!("merge: merging with existing document({id})");
                let document = merge(
                    &command.document,
                    existing,
                    self.schema.as_ref(),
                    self.config.overwrite_multi_valued,
                )?;
                AddCommand { document, ..command }
            }
            None => {
                debug!("merge: new insert({id})");
                command
            }
        };

        self.next.process_add(command)
    }

    fn add_by_query(&self, command: AddCommand, query: &str) -> Result<()> {
        debug!("merge: merge into existing documents({query})");

        let template = without_unique_key(&command.document, self.schema.as_ref());
        resolve_fields(self.schema.as_ref(), template.field_names())?;
        let matches = self.lookup.find_by_query(query)?;

        for (id, existing) in matches {
            let merged = merge(
                &template,
                existing,
                self.schema.as_ref(),
                self.config.overwrite_multi_valued,
            )?;
            debug!("merge: merged({id}) = {merged:?}");
            self.next.process_add(AddCommand::for_merged(merged))?;
        }

        Ok(())
    }

    fn strip_fields(&self, existing: Document) -> Result<()> {
        let remaining = delete_fields(existing, &self.config.delete_fields);
        self.next.process_add(AddCommand::for_merged(remaining))
    }
}

/// Every non-empty name must resolve against `schema`.
fn resolve_fields<'a>(
    schema: &dyn FieldSchema,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    for name in names.into_iter().filter(|name| !name.is_empty()) {
        schema.is_multi_valued(name)?;
    }
    Ok(())
}

impl UpdateSink for MergeProcessor {
    fn process_add(&self, command: AddCommand) -> Result<()> {
        match self.config.merge_query.as_deref() {
            Some(query) => self.add_by_query(command, query),
            None => self.add_by_id(command),
        }
    }

    fn process_delete(&self, command: DeleteCommand) -> Result<()> {
        if let Some(id) = &command.id {
            debug!("merge: delete {id}");
            match self.lookup.find_by_id(id)? {
                Some(existing) => {
                    debug!("merge: deleting fields from existing document({id})");
                    self.strip_fields(existing)?;
                }
                None => debug!("merge: delete from unknown document({id})"),
            }
        }

        if let Some(query) = &command.query {
            debug!("merge: delete fields from existing documents({query})");
            for (_, existing) in self.lookup.find_by_query(query)? {
                self.strip_fields(existing)?;
            }
        }

        Ok(())
    }
}
