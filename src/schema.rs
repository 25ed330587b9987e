//! Field metadata consulted by the merge engine.
//!
//! The merge engine only needs three facts about the schema: the unique key
//! field, whether a field is multi-valued, and whether a field is the target
//! of a copy-field rule. Those are exposed through [`FieldSchema`] so that any
//! schema source can back the engine. [`Schema`] is the concrete,
//! JSON-loadable implementation.
//!
//! # JSON layout
//!
//! ```json
//! {
//!   "unique_key": "id",
//!   "fields": {
//!     "id": {},
//!     "title": {},
//!     "tags": { "multi_valued": true },
//!     "text": { "multi_valued": true }
//!   },
//!   "dynamic_fields": { "*_ss": { "multi_valued": true } },
//!   "copy_fields": [ { "source": "title", "dest": "text" } ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DocMergeError, Result};

/// Read-only schema capability used by the merge engine.
///
/// Lookups of fields that the schema cannot resolve fail with
/// [`DocMergeError::UnknownField`].
pub trait FieldSchema: Send + Sync {
    /// Name of the field holding each document's unique identifier.
    fn unique_key_field(&self) -> &str;

    fn is_multi_valued(&self, field: &str) -> Result<bool>;

    /// Whether `field` is populated from other fields by a copy-field rule.
    fn is_copy_field_target(&self, field: &str) -> Result<bool>;
}

const FIELD_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.\-]*$";
const DYNAMIC_PATTERN: &str = r"^(\*[A-Za-z0-9_.\-]+|[A-Za-z_][A-Za-z0-9_.\-]*\*)$";

/// Options for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Whether the field may hold an ordered sequence of values.
    #[serde(default)]
    pub multi_valued: bool,

    /// Whether the field's values are retrievable from the store.
    /// Fields that are not stored cannot survive a merge.
    #[serde(default = "default_stored")]
    pub stored: bool,
}

fn default_stored() -> bool {
    true
}

impl FieldOption {
    pub fn single() -> Self {
        Self {
            multi_valued: false,
            stored: true,
        }
    }

    pub fn multi() -> Self {
        Self {
            multi_valued: true,
            stored: true,
        }
    }

    pub fn with_stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }
}

impl Default for FieldOption {
    fn default() -> Self {
        Self::single()
    }
}

/// A rule copying the values of `source` into `dest` at write time.
///
/// `source` may be a glob with a single leading or trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyField {
    pub source: String,
    pub dest: String,
}

impl CopyField {
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// Whether this rule applies to values of `field`.
    pub fn applies_to(&self, field: &str) -> bool {
        if self.source.contains('*') {
            glob_matches(&self.source, field)
        } else {
            self.source == field
        }
    }
}

/// Declared fields, dynamic field patterns, copy-field rules and the unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub unique_key: String,
    pub fields: HashMap<String, FieldOption>,
    /// Options for any field whose name matches the pattern
    /// (`*_s` or `attr_*`). Declared fields take precedence.
    #[serde(default)]
    pub dynamic_fields: BTreeMap<String, FieldOption>,
    #[serde(default)]
    pub copy_fields: Vec<CopyField>,
}

impl Schema {
    pub fn builder(unique_key: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(unique_key)
    }

    /// Parse and validate a schema from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load and validate a schema from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Resolve the options for `name`.
    ///
    /// Declared fields win; otherwise the longest matching dynamic pattern
    /// is used. Patterns of equal length are ordered by name and the first
    /// one wins.
    pub fn field(&self, name: &str) -> Result<&FieldOption> {
        if let Some(option) = self.fields.get(name) {
            return Ok(option);
        }

        self.dynamic_fields
            .iter()
            .filter(|(pattern, _)| glob_matches(pattern, name))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .map(|(_, option)| option)
            .ok_or_else(|| DocMergeError::unknown_field(name))
    }

    /// Copy-field destinations fed by values of `source`, in rule order.
    pub fn copy_targets_for<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.copy_fields
            .iter()
            .filter(move |rule| rule.applies_to(source))
            .map(|rule| rule.dest.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        let field_name = Regex::new(FIELD_NAME_PATTERN)
            .map_err(|e| DocMergeError::schema(format!("invalid field name pattern: {e}")))?;
        let dynamic = Regex::new(DYNAMIC_PATTERN)
            .map_err(|e| DocMergeError::schema(format!("invalid dynamic pattern: {e}")))?;

        for name in self.fields.keys() {
            if !field_name.is_match(name) {
                return Err(DocMergeError::schema(format!(
                    "invalid field name '{name}'"
                )));
            }
        }

        for pattern in self.dynamic_fields.keys() {
            if !dynamic.is_match(pattern) {
                return Err(DocMergeError::schema(format!(
                    "invalid dynamic field pattern '{pattern}'"
                )));
            }
        }

        match self.fields.get(&self.unique_key) {
            None => {
                return Err(DocMergeError::schema(format!(
                    "unique key '{}' is not a declared field",
                    self.unique_key
                )));
            }
            Some(option) if option.multi_valued => {
                return Err(DocMergeError::schema(format!(
                    "unique key '{}' must not be multi-valued",
                    self.unique_key
                )));
            }
            Some(option) if !option.stored => {
                return Err(DocMergeError::schema(format!(
                    "unique key '{}' must be stored",
                    self.unique_key
                )));
            }
            Some(_) => {}
        }

        for rule in &self.copy_fields {
            if rule.source.contains('*') {
                if !dynamic.is_match(&rule.source) {
                    return Err(DocMergeError::schema(format!(
                        "invalid copy field source pattern '{}'",
                        rule.source
                    )));
                }
            } else {
                self.field(&rule.source)?;
            }

            if rule.dest == self.unique_key {
                return Err(DocMergeError::schema(format!(
                    "unique key '{}' cannot be a copy field destination",
                    self.unique_key
                )));
            }
            self.field(&rule.dest)?;
        }

        Ok(())
    }
}

impl FieldSchema for Schema {
    fn unique_key_field(&self) -> &str {
        &self.unique_key
    }

    fn is_multi_valued(&self, field: &str) -> Result<bool> {
        Ok(self.field(field)?.multi_valued)
    }

    fn is_copy_field_target(&self, field: &str) -> Result<bool> {
        self.field(field)?;
        Ok(self.copy_fields.iter().any(|rule| rule.dest == field))
    }
}

/// Match `name` against a pattern with a single leading or trailing `*`.
fn glob_matches(pattern: &str, name: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        name.len() > suffix.len() && name.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        name.len() > prefix.len() && name.starts_with(prefix)
    } else {
        pattern == name
    }
}

pub struct SchemaBuilder {
    unique_key: String,
    fields: HashMap<String, FieldOption>,
    dynamic_fields: BTreeMap<String, FieldOption>,
    copy_fields: Vec<CopyField>,
}

impl SchemaBuilder {
    pub fn new(unique_key: impl Into<String>) -> Self {
        let unique_key = unique_key.into();
        let mut fields = HashMap::new();
        fields.insert(unique_key.clone(), FieldOption::single());
        Self {
            unique_key,
            fields,
            dynamic_fields: BTreeMap::new(),
            copy_fields: Vec::new(),
        }
    }

    pub fn add_field(mut self, name: impl Into<String>, option: FieldOption) -> Self {
        self.fields.insert(name.into(), option);
        self
    }

    pub fn add_dynamic_field(mut self, pattern: impl Into<String>, option: FieldOption) -> Self {
        self.dynamic_fields.insert(pattern.into(), option);
        self
    }

    pub fn add_copy_field(mut self, source: impl Into<String>, dest: impl Into<String>) -> Self {
        self.copy_fields.push(CopyField::new(source, dest));
        self
    }

    pub fn build(self) -> Result<Schema> {
        let schema = Schema {
            unique_key: self.unique_key,
            fields: self.fields,
            dynamic_fields: self.dynamic_fields,
            copy_fields: self.copy_fields,
        };
        schema.validate()?;
        Ok(schema)
    }
}
