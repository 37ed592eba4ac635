//! Value reshaping: enumerations, keyed sequences and resource pivots

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

use super::{require_field, FieldMapper};
use crate::document::Document;
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::schema::{Field, FieldType, Schema};

/// Map internal values onto user-facing labels
///
/// Each label owns a list of accepted internal values; the first one is
/// canonical and is what the label projects back to.
#[derive(Debug, Clone, Serialize)]
pub struct Enum {
    pub field: String,
    pub values: Vec<(String, Vec<String>)>,
}

impl Enum {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            values: Vec::new(),
        }
    }

    /// Declare a label and the internal values it accepts
    pub fn value(mut self, label: impl Into<String>, accepted: &[&str]) -> Self {
        self.values
            .push((label.into(), accepted.iter().map(|s| s.to_string()).collect()));
        self
    }
}

impl FieldMapper for Enum {
    fn from_internal(&self, data: &mut Document) {
        let current = match data.get(&self.field).and_then(Value::as_str) {
            Some(current) => current,
            None => return,
        };
        let label = self
            .values
            .iter()
            .find(|(_, accepted)| accepted.iter().any(|v| v == current))
            .map(|(label, _)| label.clone());
        if let Some(label) = label {
            data.insert(self.field.clone(), Value::String(label));
        }
    }

    fn to_internal(&self, data: &mut Document) {
        let current = match data.get(&self.field).and_then(Value::as_str) {
            Some(current) => current,
            None => return,
        };
        let canonical = self
            .values
            .iter()
            .find(|(label, _)| label == current)
            .and_then(|(_, accepted)| accepted.first().cloned());
        if let Some(canonical) = canonical {
            data.insert(self.field.clone(), Value::String(canonical));
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, &self.field)?;
        if let Some((label, _)) = self.values.iter().find(|(_, accepted)| accepted.is_empty()) {
            return Err(SchemaError::invalid_mapper(
                "enum",
                &schema.id,
                format!("label {} accepts no values", label),
            ));
        }
        let mut field = Field::scalar("enum");
        field.options = self.values.iter().map(|(label, _)| label.clone()).collect();
        schema.resource_fields.insert(self.field.clone(), field);
        Ok(())
    }
}

/// Turn a sequence of mappings into a mapping keyed by one attribute
///
/// Ordering is lost: inward the sequence comes back sorted by key. On
/// duplicate keys the later element wins.
#[derive(Debug, Clone, Serialize)]
pub struct SliceToMap {
    pub field: String,
    pub key: String,
}

impl SliceToMap {
    pub fn new(field: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            key: key.into(),
        }
    }
}

impl FieldMapper for SliceToMap {
    fn from_internal(&self, data: &mut Document) {
        let items = match data.get(&self.field).and_then(Value::as_array) {
            Some(items) => items,
            None => return,
        };

        let mut keyed = Document::new();
        for item in items {
            let mut entry = match item.as_object() {
                Some(entry) => entry.clone(),
                None => return,
            };
            let key = match entry.remove(&self.key) {
                Some(Value::String(key)) => key,
                _ => return,
            };
            keyed.insert(key, Value::Object(entry));
        }
        data.insert(self.field.clone(), Value::Object(keyed));
    }

    fn to_internal(&self, data: &mut Document) {
        let keyed = match data.get(&self.field).and_then(Value::as_object) {
            Some(keyed) => keyed,
            None => return,
        };

        let mut items = Vec::with_capacity(keyed.len());
        for (key, value) in keyed {
            let mut entry = match value.as_object() {
                Some(entry) => entry.clone(),
                None => return,
            };
            entry.insert(self.key.clone(), Value::String(key.clone()));
            items.push(Value::Object(entry));
        }
        data.insert(self.field.clone(), Value::Array(items));
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        let field = require_field(schema, &self.field)?;
        let inner = match &field.field_type {
            FieldType::Array(inner) => inner.clone(),
            other => {
                return Err(SchemaError::invalid_mapper(
                    "sliceToMap",
                    &schema.id,
                    format!("{} has type {}, not an array", self.field, other),
                ))
            }
        };
        schema
            .resource_fields
            .insert(self.field.clone(), Field::new(FieldType::Map(inner)));
        Ok(())
    }
}

const REQUESTS: &str = "requests";
const LIMITS: &str = "limits";
const REQUEST: &str = "request";
const LIMIT: &str = "limit";

/// One side of the pair; absent counts as empty, any other shape as invalid
fn pivot_side<'a>(data: &'a Document, name: &str, empty: &'a Document) -> Option<&'a Document> {
    match data.get(name) {
        None => Some(empty),
        Some(value) => value.as_object(),
    }
}

fn is_pivoted(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |entry| entry.keys().all(|k| k == REQUEST || k == LIMIT))
}

/// Pivot paired `requests`/`limits` blocks into one entry per resource
///
/// `{requests: {cpu: 1}, limits: {cpu: 2}}` becomes
/// `{cpu: {request: 1, limit: 2}}`. With `plural` set a missing side is
/// written as null, otherwise it is omitted. Inward nulls are skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PivotMapper {
    pub plural: bool,
}

impl PivotMapper {
    pub fn new(plural: bool) -> Self {
        Self { plural }
    }
}

impl FieldMapper for PivotMapper {
    fn from_internal(&self, data: &mut Document) {
        let empty = Document::new();
        let (requests, limits) = match (pivot_side(data, REQUESTS, &empty), pivot_side(data, LIMITS, &empty)) {
            (Some(requests), Some(limits)) => (requests, limits),
            _ => return,
        };

        let resources: BTreeSet<&String> = requests.keys().chain(limits.keys()).collect();
        let mut pivoted = Document::new();
        for resource in resources {
            let mut entry = Document::new();
            for (key, values) in [(REQUEST, requests), (LIMIT, limits)] {
                match values.get(resource.as_str()) {
                    Some(value) => {
                        entry.insert(key.to_string(), value.clone());
                    }
                    None if self.plural => {
                        entry.insert(key.to_string(), Value::Null);
                    }
                    None => {}
                }
            }
            pivoted.insert(resource.clone(), Value::Object(entry));
        }

        data.remove(REQUESTS);
        data.remove(LIMITS);
        data.extend(pivoted);
    }

    fn to_internal(&self, data: &mut Document) {
        let resources: Vec<String> = data
            .iter()
            .filter(|(key, value)| key.as_str() != REQUESTS && key.as_str() != LIMITS && is_pivoted(value))
            .map(|(key, _)| key.clone())
            .collect();

        let mut requests = Document::new();
        let mut limits = Document::new();
        for resource in resources {
            if let Some(Value::Object(entry)) = data.remove(&resource) {
                for (key, value) in entry {
                    let side = match key.as_str() {
                        REQUEST => &mut requests,
                        LIMIT => &mut limits,
                        _ => continue,
                    };
                    if !value.is_null() {
                        side.insert(resource.clone(), value);
                    }
                }
            }
        }

        if !requests.is_empty() {
            data.insert(REQUESTS.to_string(), Value::Object(requests));
        }
        if !limits.is_empty() {
            data.insert(LIMITS.to_string(), Value::Object(limits));
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, REQUESTS)?;
        require_field(schema, LIMITS)?;
        schema.resource_fields.remove(REQUESTS);
        schema.resource_fields.remove(LIMITS);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::ApiVersion;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn schema_with(fields: &[(&str, &str)]) -> Schema {
        let mut schema = Schema::new("test", ApiVersion::new("g", "v1", "/v1-g"));
        for (name, ty) in fields {
            schema
                .resource_fields
                .insert(name.to_string(), Field::new(FieldType::parse(ty).unwrap()));
        }
        schema
    }

    fn mount_propagation() -> Enum {
        Enum::new("mountPropagation")
            .value("HostToContainer", &["rslave"])
            .value("Bidirectional", &["rshared", "shared"])
    }

    #[test]
    fn test_enum_canonicalization() {
        let mapper = mount_propagation();
        for (label, accepted) in &mapper.values {
            for value in accepted {
                let mut data = doc(json!({"mountPropagation": value}));
                mapper.from_internal(&mut data);
                assert_eq!(data["mountPropagation"], json!(label));
            }
            let mut data = doc(json!({"mountPropagation": label}));
            mapper.to_internal(&mut data);
            assert_eq!(data["mountPropagation"], json!(accepted[0]));
        }
    }

    #[test]
    fn test_enum_unmatched_value_unchanged() {
        let mut data = doc(json!({"mountPropagation": "private"}));
        mount_propagation().from_internal(&mut data);
        assert_eq!(data["mountPropagation"], json!("private"));
    }

    #[test]
    fn test_enum_modify_schema_sets_options() {
        let mut schema = schema_with(&[("mountPropagation", "string")]);
        mount_propagation()
            .modify_schema(&mut schema, &SchemaRegistry::default())
            .unwrap();
        let field = schema.field("mountPropagation").unwrap();
        assert_eq!(field.field_type, FieldType::scalar("enum"));
        assert_eq!(field.options, ["HostToContainer", "Bidirectional"]);
    }

    #[test]
    fn test_slice_to_map_last_wins() {
        let mapper = SliceToMap::new("volumes", "name");
        let mut data = doc(json!({
            "volumes": [
                {"name": "data", "emptyDir": {}},
                {"name": "data", "hostPath": {"path": "/srv"}}
            ]
        }));
        mapper.from_internal(&mut data);
        assert_eq!(
            Value::Object(data),
            json!({"volumes": {"data": {"hostPath": {"path": "/srv"}}}})
        );
    }

    #[test]
    fn test_slice_to_map_round_trip_sorted() {
        let mapper = SliceToMap::new("volumes", "name");
        let mut data = doc(json!({"volumes": [{"name": "v2"}, {"name": "v1", "emptyDir": {}}]}));
        mapper.from_internal(&mut data);
        assert_eq!(data["volumes"], json!({"v1": {"emptyDir": {}}, "v2": {}}));

        mapper.to_internal(&mut data);
        assert_eq!(
            data["volumes"],
            json!([{"name": "v1", "emptyDir": {}}, {"name": "v2"}])
        );
    }

    #[test]
    fn test_slice_to_map_invalid_element_unchanged() {
        let mapper = SliceToMap::new("hostAliases", "ip");
        let original = doc(json!({"hostAliases": [{"ip": "10.0.0.1"}, {"hostnames": ["x"]}]}));
        let mut data = original.clone();
        mapper.from_internal(&mut data);
        assert_eq!(data, original);

        let original = doc(json!({"hostAliases": [{"ip": "10.0.0.1"}, "bad"]}));
        let mut data = original.clone();
        mapper.from_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_slice_to_map_requires_array() {
        let registry = SchemaRegistry::default();
        let mut schema = schema_with(&[("volumes", "array[volume]"), ("name", "string")]);
        SliceToMap::new("volumes", "name")
            .modify_schema(&mut schema, &registry)
            .unwrap();
        assert_eq!(schema.field("volumes").unwrap().field_type.to_string(), "map[volume]");

        let err = SliceToMap::new("name", "x").modify_schema(&mut schema, &registry);
        assert!(matches!(err, Err(SchemaError::InvalidMapper { .. })));
    }

    #[test]
    fn test_pivot_plural_writes_nulls() {
        let mapper = PivotMapper::new(true);
        let original = doc(json!({"requests": {"cpu": "100m", "memory": "64Mi"}, "limits": {"cpu": "1"}}));
        let mut data = original.clone();
        mapper.from_internal(&mut data);
        assert_eq!(
            Value::Object(data.clone()),
            json!({
                "cpu": {"request": "100m", "limit": "1"},
                "memory": {"request": "64Mi", "limit": null}
            })
        );

        mapper.to_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_pivot_singular_omits_missing_side() {
        let mut data = doc(json!({"limits": {"memory": "1Gi"}}));
        PivotMapper::new(false).from_internal(&mut data);
        assert_eq!(Value::Object(data), json!({"memory": {"limit": "1Gi"}}));
    }

    #[test]
    fn test_pivot_wrong_shape_unchanged() {
        let original = doc(json!({"limits": "1Gi"}));
        let mut data = original.clone();
        PivotMapper::new(true).from_internal(&mut data);
        assert_eq!(data, original);
    }
}
