//! Field-level reconciliation of incoming and stored documents.
//!
//! These functions are pure: they take documents by value or reference and
//! return a new document. Fetching and writing is the job of
//! [`crate::processor::MergeProcessor`].

use crate::data::Document;
use crate::error::Result;
use crate::schema::FieldSchema;

/// Merge an incoming (possibly partial) document into an existing one.
///
/// - Fields only in `existing` are kept as stored.
/// - Fields only in `incoming` are added.
/// - Fields in both are replaced by the incoming value(s), except
///   multi-valued fields when `overwrite_multi_valued` is false: those keep
///   the existing values and append the incoming ones after them.
///
/// Every incoming field must resolve against `schema`; an unknown field is
/// reported as [`crate::DocMergeError::UnknownField`] regardless of mode.
pub fn merge(
    incoming: &Document,
    existing: Document,
    schema: &dyn FieldSchema,
    overwrite_multi_valued: bool,
) -> Result<Document> {
    let mut merged = existing;

    for name in incoming.fields.keys() {
        let multi_valued = schema.is_multi_valued(name)?;
        if overwrite_multi_valued || !multi_valued {
            merged.remove_field(name);
        }
    }

    for (name, value) in incoming.iter() {
        merged.add_field(name.clone(), value.clone());
    }

    Ok(merged)
}

/// Remove the named fields from `existing`.
///
/// The result is a replacement document to be re-added, not a store-level
/// delete. Names that are not present are ignored.
pub fn delete_fields<S: AsRef<str>>(existing: Document, fields: &[S]) -> Document {
    let mut remaining = existing;
    for name in fields {
        remaining.remove_field(name.as_ref());
    }
    remaining
}

/// Flatten repeated, comma-separated field lists into one ordered list.
///
/// `["a,b", "c"]` becomes `["a", "b", "c"]`. Order and duplicates are kept.
pub fn parse_delete_field_spec<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|param| param.as_ref().split(','))
        .map(str::to_string)
        .collect()
}

/// Copy of `doc` without its unique key field.
///
/// Used as the template for query-scoped merges, where each matched
/// document keeps its own identifier.
pub fn without_unique_key(doc: &Document, schema: &dyn FieldSchema) -> Document {
    let mut template = doc.clone();
    template.remove_field(schema.unique_key_field());
    template
}
