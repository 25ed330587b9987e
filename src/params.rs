//! Request-scoped parameters and the merge configuration derived from them.

use std::collections::HashMap;

use crate::error::{DocMergeError, Result};
use crate::merge::parse_delete_field_spec;

/// Activates the merge stage for the request.
pub const MERGE: &str = "merge";
/// Selects overwrite (`true`) or additive (`false`) multi-valued semantics.
pub const OVERWRITE_MULTIVALUES: &str = "overwriteMultivalues";
/// Query selecting the documents an add is merged into.
pub const MERGE_QUERY: &str = "merge.query";
/// Fields to strip on a field-scoped delete. Repeatable, comma-separated.
pub const DELETE_FIELD: &str = "delete.field";

/// Multi-valued string parameters of a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, Vec<String>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name`, keeping earlier values.
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Replace all values for `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), vec![value.into()]);
    }

    /// The first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|vs| vs.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parse the first value for `name` as a boolean.
    ///
    /// Accepts `true`/`on`/`yes` and `false`/`off`/`no`, case-insensitively.
    pub fn get_bool(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                DocMergeError::invalid_argument(format!(
                    "invalid boolean value '{raw}' for parameter '{name}'"
                ))
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Params::new(), |params, (k, v)| params.add(k, v))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => Some(true),
        "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Merge behaviour for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// When false the merge stage passes commands through untouched.
    pub enabled: bool,
    pub overwrite_multi_valued: bool,
    /// Present only when non-blank.
    pub merge_query: Option<String>,
    pub delete_fields: Vec<String>,
}

impl MergeConfig {
    pub fn from_params(params: &Params) -> Result<Self> {
        let merge_query = params
            .get(MERGE_QUERY)
            .filter(|q| !q.trim().is_empty())
            .map(str::to_string);

        Ok(Self {
            enabled: params.get_bool(MERGE, false)?,
            overwrite_multi_valued: params.get_bool(OVERWRITE_MULTIVALUES, true)?,
            merge_query,
            delete_fields: parse_delete_field_spec(params.get_all(DELETE_FIELD)),
        })
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            overwrite_multi_valued: true,
            merge_query: None,
            delete_fields: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::from_params(&Params::new()).unwrap();
        assert_eq!(config, MergeConfig::default());
        assert!(!config.enabled);
        assert!(config.overwrite_multi_valued);
    }

    #[test]
    fn test_from_params() {
        let params: Params = [
            (MERGE, "true"),
            (OVERWRITE_MULTIVALUES, "off"),
            (MERGE_QUERY, "section:news"),
            (DELETE_FIELD, "title,tags"),
            (DELETE_FIELD, "body"),
        ]
        .into_iter()
        .collect();

        let config = MergeConfig::from_params(&params).unwrap();
        assert!(config.enabled);
        assert!(!config.overwrite_multi_valued);
        assert_eq!(config.merge_query.as_deref(), Some("section:news"));
        assert_eq!(config.delete_fields, vec!["title", "tags", "body"]);
    }

    #[test]
    fn test_blank_merge_query_is_absent() {
        let params = Params::new().add(MERGE_QUERY, "   ");
        let config = MergeConfig::from_params(&params).unwrap();
        assert_eq!(config.merge_query, None);
    }

    #[test]
    fn test_invalid_bool() {
        let params = Params::new().add(MERGE, "maybe");
        let err = MergeConfig::from_params(&params).unwrap_err();
        assert!(matches!(err, DocMergeError::InvalidArgument(_)));
    }

    #[test]
    fn test_get_first_value() {
        let mut params = Params::new().add("q", "a").add("q", "b");
        assert_eq!(params.get("q"), Some("a"));
        assert_eq!(params.get_all("q").len(), 2);
        params.set("q", "c");
        assert_eq!(params.get_all("q"), ["c".to_string()]);
    }
}
