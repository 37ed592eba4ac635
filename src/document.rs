//! Documents and path addressing
//!
//! A document is a JSON object. Paths address nested keys with
//! `/`-separated segments (`deploymentStrategy/orderedConfig/partition`).
//! Reads never fail on a missing intermediate, writes create missing
//! intermediate mappings, and removals prune the mappings they empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchemaError};

/// A nested key/value document
pub type Document = serde_json::Map<String, Value>;

static PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+(/[A-Za-z0-9_.\-]+)*$").unwrap());

/// A parsed `/`-separated path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a path, rejecting empty segments and leading or trailing separators
    pub fn parse(path: &str) -> Result<Self> {
        if !PATH_PATTERN.is_match(path) {
            return Err(SchemaError::MalformedPath(path.to_string()));
        }
        Ok(Self(path.split('/').map(String::from).collect()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The top-level key this path starts at
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    /// The key this path ends at
    pub fn last(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    /// Whether the path reaches below the top level
    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }

    pub fn get<'a>(&self, data: &'a Document) -> Option<&'a Value> {
        get_value(data, &self.0)
    }

    pub fn put(&self, data: &mut Document, value: Value) -> bool {
        put_value(data, &self.0, value)
    }

    pub fn remove(&self, data: &mut Document) -> Option<Value> {
        remove_value(data, &self.0)
    }
}

impl FromStr for FieldPath {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Read the value at `path`
pub fn get_value<'a, S: AsRef<str>>(data: &'a Document, path: &[S]) -> Option<&'a Value> {
    match path {
        [] => None,
        [last] => data.get(last.as_ref()),
        [head, rest @ ..] => get_value(data.get(head.as_ref())?.as_object()?, rest),
    }
}

/// Read the mapping at `path`
pub fn get_map<'a, S: AsRef<str>>(data: &'a Document, path: &[S]) -> Option<&'a Document> {
    get_value(data, path)?.as_object()
}

/// Read the string at `path`
pub fn get_str<'a, S: AsRef<str>>(data: &'a Document, path: &[S]) -> Option<&'a str> {
    get_value(data, path)?.as_str()
}

/// Read the sequence of mappings at `path`, skipping elements that are not mappings
pub fn get_slice<'a, S: AsRef<str>>(data: &'a Document, path: &[S]) -> Vec<&'a Document> {
    get_value(data, path)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// Write `value` at `path`, creating missing intermediate mappings
///
/// Returns false and leaves the document untouched when an existing
/// intermediate is not a mapping.
pub fn put_value<S: AsRef<str>>(data: &mut Document, path: &[S], value: Value) -> bool {
    match path {
        [] => false,
        [last] => {
            data.insert(last.as_ref().to_string(), value);
            true
        }
        [head, rest @ ..] => {
            if data.get(head.as_ref()).map_or(false, |v| !v.is_object()) {
                return false;
            }
            let child = data
                .entry(head.as_ref().to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            match child.as_object_mut() {
                Some(map) => put_value(map, rest, value),
                None => false,
            }
        }
    }
}

/// Remove and return the value at `path`
///
/// Ancestor mappings left empty by the removal are removed as well.
pub fn remove_value<S: AsRef<str>>(data: &mut Document, path: &[S]) -> Option<Value> {
    match path {
        [] => None,
        [last] => data.remove(last.as_ref()),
        [head, rest @ ..] => {
            let child = data.get_mut(head.as_ref())?.as_object_mut()?;
            let removed = remove_value(child, rest)?;
            if child.is_empty() {
                data.remove(head.as_ref());
            }
            Some(removed)
        }
    }
}

/// Lowercase the first character (`StatefulSet` -> `statefulSet`)
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Uppercase the first character (`statefulSet` -> `StatefulSet`)
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_path() {
        let path = FieldPath::parse("deploymentStrategy/orderedConfig/partition").unwrap();
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.first(), "deploymentStrategy");
        assert_eq!(path.last(), "partition");
        assert!(path.is_nested());
        assert_eq!(path.to_string(), "deploymentStrategy/orderedConfig/partition");
    }

    #[test]
    fn test_parse_malformed_path() {
        for bad in ["", "/a", "a/", "a//b", "a b"] {
            assert!(FieldPath::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_get_missing_intermediate() {
        let data = doc(json!({"a": {"b": 1}, "s": "x"}));
        assert_eq!(get_value(&data, &["a", "b"]), Some(&json!(1)));
        assert_eq!(get_value(&data, &["a", "c", "d"]), None);
        assert_eq!(get_value(&data, &["s", "x"]), None);
    }

    #[test]
    fn test_put_creates_intermediates() {
        let mut data = Document::new();
        assert!(put_value(&mut data, &["a", "b", "c"], json!(true)));
        assert_eq!(Value::Object(data), json!({"a": {"b": {"c": true}}}));
    }

    #[test]
    fn test_put_through_scalar_is_noop() {
        let mut data = doc(json!({"a": 1}));
        assert!(!put_value(&mut data, &["a", "b"], json!(2)));
        assert_eq!(Value::Object(data), json!({"a": 1}));
    }

    #[test]
    fn test_remove_prunes_emptied_ancestors() {
        let mut data = doc(json!({"a": {"b": {"c": 1}}, "d": {"e": 1, "f": 2}}));
        assert_eq!(remove_value(&mut data, &["a", "b", "c"]), Some(json!(1)));
        assert_eq!(remove_value(&mut data, &["d", "e"]), Some(json!(1)));
        assert_eq!(Value::Object(data), json!({"d": {"f": 2}}));
    }

    #[test]
    fn test_get_slice_skips_non_mappings() {
        let data = doc(json!({"items": [{"a": 1}, 2, {"b": 3}]}));
        assert_eq!(get_slice(&data, &["items"]).len(), 2);
        assert!(get_slice(&data, &["missing"]).is_empty());
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(lower_first("StatefulSet"), "statefulSet");
        assert_eq!(upper_first("daemonSet"), "DaemonSet");
        assert_eq!(lower_first(""), "");
    }
}
