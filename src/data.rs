use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::error::{DocMergeError, Result};

/// A single scalar value held by a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),

    /// String content typically used for keywords, IDs, or non-tokenized metadata.
    String(String),

    /// Text content to be full-text indexed.
    Text(String),

    /// Binary content with an optional MIME type.
    Bytes(Vec<u8>, Option<String>),

    /// Date and time in UTC.
    DateTime(chrono::DateTime<chrono::Utc>),

    /// Geographical point (latitude, longitude).
    Geo(f64, f64),
}

impl DataValue {
    /// Returns the text value if this is a Text or String variant.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) | DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The exact-match term for this value.
    ///
    /// Stores compare identifiers and query terms against this form.
    /// `Null` and `Bytes` have no term representation.
    pub fn as_term(&self) -> Option<String> {
        match self {
            DataValue::String(s) | DataValue::Text(s) => Some(s.clone()),
            DataValue::Int64(i) => Some(i.to_string()),
            DataValue::Float64(f) => Some(f.to_string()),
            DataValue::Bool(b) => Some(b.to_string()),
            DataValue::DateTime(dt) => Some(dt.to_rfc3339()),
            DataValue::Geo(lat, lon) => Some(format!("{lat},{lon}")),
            DataValue::Null | DataValue::Bytes(..) => None,
        }
    }
}

// --- Conversions ---

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Text(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Text(v.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Int64(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int64(v as i64)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float64(v)
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DataValue {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        DataValue::DateTime(dt)
    }
}

/// The value(s) of one document field: a scalar or an ordered sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(DataValue),
    Multi(Vec<DataValue>),
}

impl FieldValue {
    /// All values of this field in order.
    pub fn values(&self) -> &[DataValue] {
        match self {
            FieldValue::Single(v) => std::slice::from_ref(v),
            FieldValue::Multi(vs) => vs,
        }
    }

    pub fn into_values(self) -> Vec<DataValue> {
        match self {
            FieldValue::Single(v) => vec![v],
            FieldValue::Multi(vs) => vs,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Append `other` after the current values.
    ///
    /// The result is always `Multi`, with the existing values first.
    pub fn append(&mut self, other: FieldValue) {
        let current = std::mem::replace(self, FieldValue::Multi(Vec::new()));
        let mut values = current.into_values();
        values.extend(other.into_values());
        *self = FieldValue::Multi(values);
    }
}

impl From<DataValue> for FieldValue {
    fn from(v: DataValue) -> Self {
        FieldValue::Single(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Single(v.into())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Single(v.into())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Single(v.into())
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Single(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Single(v.into())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Single(v.into())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for FieldValue {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        FieldValue::Single(v.into())
    }
}

impl<T: Into<DataValue>> From<Vec<T>> for FieldValue {
    fn from(vs: Vec<T>) -> Self {
        FieldValue::Multi(vs.into_iter().map(Into::into).collect())
    }
}

/// A named-field record submitted to or read back from the index.
///
/// The unique identifier is an ordinary field whose name is given by the
/// schema's unique key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub fields: HashMap<String, FieldValue>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// Add value(s) to a field.
    ///
    /// Adding to a field that already holds values appends to it rather
    /// than replacing it. Use [`Document::set_field`] to replace.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        match self.fields.entry(name.into()) {
            Entry::Occupied(mut entry) => entry.get_mut().append(value.into()),
            Entry::Vacant(entry) => {
                entry.insert(value.into());
            }
        }
    }

    /// Builder-style variant of [`Document::add_field`].
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.add_field(name, value);
        self
    }

    /// Replace a field's value(s).
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Get a reference to a field's value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All field names, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The document's identifier read from `key_field`.
    ///
    /// Fails with [`DocMergeError::MissingUniqueKey`] when the field is
    /// absent, holds more than one value, or has no term form.
    pub fn unique_key(&self, key_field: &str) -> Result<String> {
        match self.fields.get(key_field).map(FieldValue::values) {
            Some([value]) => value
                .as_term()
                .ok_or_else(|| DocMergeError::MissingUniqueKey(key_field.to_string())),
            _ => Err(DocMergeError::MissingUniqueKey(key_field.to_string())),
        }
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    pub fn add_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.document.add_field(name, value);
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_field_appends() {
        let mut doc = Document::new();
        doc.add_field("tags", "a");
        assert_eq!(doc.get("tags"), Some(&FieldValue::Single("a".into())));

        doc.add_field("tags", vec!["b", "c"]);
        assert_eq!(doc.get("tags"), Some(&FieldValue::from(vec!["a", "b", "c"])));
    }

    #[test]
    fn test_set_field_replaces() {
        let mut doc = Document::builder().add_field("title", "Old").build();
        doc.set_field("title", "New");
        assert_eq!(doc.get("title"), Some(&FieldValue::from("New")));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_unique_key() {
        let doc = Document::builder().add_field("id", 7).build();
        assert_eq!(doc.unique_key("id").unwrap(), "7");

        let multi = Document::builder().add_field("id", vec!["1", "2"]).build();
        assert!(matches!(
            multi.unique_key("id"),
            Err(DocMergeError::MissingUniqueKey(_))
        ));

        assert!(Document::new().unique_key("id").is_err());
    }

    #[test]
    fn test_field_value_serde_shape() {
        let single: FieldValue = serde_json::from_str(r#"{"Text":"x"}"#).unwrap();
        assert_eq!(single, FieldValue::from("x"));

        let multi: FieldValue = serde_json::from_str(r#"[{"Text":"x"},{"Int64":2}]"#).unwrap();
        assert_eq!(
            multi,
            FieldValue::Multi(vec![DataValue::Text("x".into()), DataValue::Int64(2)])
        );
    }
}
