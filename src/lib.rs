//! # docmerge
//!
//! Partial-update merging and field-scoped deletion for search index
//! documents.
//!
//! ## Features
//!
//! - Merge a partial document into the stored one by identifier
//! - Merge one document into every document matching a query
//! - Overwrite or append semantics for multi-valued fields
//! - Field-scoped delete: strip fields and re-add instead of deleting
//! - Copy-field targets are excluded from merges and recomputed on write
//! - Pluggable document store and schema; an in-memory store is included
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use docmerge::memory::MemoryDocumentStore;
//! use docmerge::params::{MERGE, OVERWRITE_MULTIVALUES};
//! use docmerge::{AddCommand, Document, DocumentStore, FieldOption};
//! use docmerge::{MergeProcessorFactory, Params, Schema, UpdateSink};
//!
//! let schema = Arc::new(
//!     Schema::builder("id")
//!         .add_field("title", FieldOption::single())
//!         .add_field("tags", FieldOption::multi())
//!         .build()?,
//! );
//! let store = Arc::new(MemoryDocumentStore::new(schema.clone()));
//! store.write(
//!     Document::builder()
//!         .add_field("id", "1")
//!         .add_field("title", "Old")
//!         .add_field("tags", vec!["a", "b"])
//!         .build(),
//! )?;
//!
//! let params = Params::new()
//!     .add(MERGE, "true")
//!     .add(OVERWRITE_MULTIVALUES, "false");
//! let chain = MergeProcessorFactory::create(&params, schema, store.clone(), store.clone())?;
//!
//! chain.process_add(AddCommand::new(
//!     Document::builder()
//!         .add_field("id", "1")
//!         .add_field("tags", vec!["c"])
//!         .build(),
//! ))?;
//!
//! let stored = store.get_by_id("1").unwrap();
//! let tags: Vec<_> = stored.values("tags").filter_map(|v| v.as_text()).collect();
//! assert_eq!(tags, vec!["a", "b", "c"]);
//! # Ok::<(), docmerge::DocMergeError>(())
//! ```

mod data;
mod error;
pub mod lookup;
pub mod merge;
pub mod params;
pub mod processor;
pub mod schema;
pub mod store;

// Re-exports for the public API
pub use data::{DataValue, Document, DocumentBuilder, FieldValue};
pub use error::{DocMergeError, ErrorKind, Result};
pub use lookup::Lookup;
pub use merge::{delete_fields, merge, parse_delete_field_spec, without_unique_key};
pub use params::{MergeConfig, Params};
pub use processor::{AddCommand, DeleteCommand, MergeProcessor, MergeProcessorFactory, UpdateSink};
pub use schema::{CopyField, FieldOption, FieldSchema, Schema, SchemaBuilder};
pub use store::memory;
pub use store::query::StoreQuery;
pub use store::{DocumentStore, StoredFields, StoredHit};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
