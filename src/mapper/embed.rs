//! Hoisting nested mappings into their parent

use serde::Serialize;
use serde_json::Value;

use super::{require_field, FieldMapper};
use crate::document::Document;
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::schema::{Field, FieldType, Schema};

/// Look up the schema of an object-typed field
fn embedded_schema<'a>(
    mapper: &'static str,
    schema: &Schema,
    field: &str,
    registry: &'a SchemaRegistry,
) -> Result<&'a Schema> {
    let id = match &require_field(schema, field)?.field_type {
        FieldType::Object(id) => id.clone(),
        other => {
            return Err(SchemaError::invalid_mapper(
                mapper,
                &schema.id,
                format!("{} has type {}, not an object", field, other),
            ))
        }
    };
    registry
        .schema(&schema.version, &id)
        .ok_or(SchemaError::UnknownType(id))
}

/// Merge `value` into `data` if it is a mapping; embedded keys win
fn merge_into(data: &mut Document, value: Value) {
    if let Value::Object(entries) = value {
        for (key, value) in entries {
            data.insert(key, value);
        }
    }
}

/// Move `keys` found in `data` under `field`
fn collect_under(data: &mut Document, field: &str, keys: &[String]) -> bool {
    let mut collected = Document::new();
    for key in keys {
        if let Some(value) = data.remove(key) {
            collected.insert(key.clone(), value);
        }
    }
    if collected.is_empty() {
        return false;
    }
    let target = data
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Document::new()));
    match target.as_object_mut() {
        Some(map) => map.extend(collected),
        None => *target = Value::Object(collected),
    }
    true
}

/// Merge a nested mapping into its parent
///
/// Inward, the keys the embedded schema declares are collected back under
/// the field. Keys the embedded schema does not declare stay at the top.
#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub field: String,
    /// Fields of the embedded schema, captured at registration
    #[serde(skip)]
    embedded_fields: Vec<String>,
}

impl Embed {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            embedded_fields: Vec::new(),
        }
    }

    /// Fields collected back inward
    pub fn embedded_fields(&self) -> &[String] {
        &self.embedded_fields
    }
}

impl FieldMapper for Embed {
    fn from_internal(&self, data: &mut Document) {
        if !data.get(&self.field).map_or(false, Value::is_object) {
            return;
        }
        if let Some(value) = data.remove(&self.field) {
            merge_into(data, value);
        }
    }

    fn to_internal(&self, data: &mut Document) {
        collect_under(data, &self.field, &self.embedded_fields);
    }

    fn modify_schema(&mut self, schema: &mut Schema, registry: &SchemaRegistry) -> Result<()> {
        let embedded = embedded_schema("embed", schema, &self.field, registry)?;
        self.embedded_fields = embedded.resource_fields.keys().cloned().collect();

        schema.resource_fields.remove(&self.field);
        for (name, field) in &embedded.resource_fields {
            schema.resource_fields.insert(name.clone(), field.clone());
        }
        Ok(())
    }
}

/// One member of a union handled by [`UnionEmbed`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionMapping {
    pub field_name: String,
    /// Keys whose presence selects this member inward
    pub check_fields: Vec<String>,
    /// Boolean key set outward to mark this member
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl UnionMapping {
    pub fn new(field_name: impl Into<String>, check_fields: &[&str]) -> Self {
        Self {
            field_name: field_name.into(),
            check_fields: check_fields.iter().map(|s| s.to_string()).collect(),
            marker: None,
        }
    }

    /// Mark this member with a boolean key that also selects it inward
    pub fn marked(field_name: impl Into<String>, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        Self {
            field_name: field_name.into(),
            check_fields: vec![marker.clone()],
            marker: Some(marker),
        }
    }

    fn selected_by(&self, data: &Document) -> bool {
        self.check_fields
            .iter()
            .all(|key| !matches!(data.get(key), None | Some(Value::Null) | Some(Value::Bool(false))))
    }
}

/// Embed whichever member of a one-of union is set
///
/// Inward, the first member whose check fields are all present is rebuilt.
#[derive(Debug, Clone, Serialize)]
pub struct UnionEmbed {
    pub fields: Vec<UnionMapping>,
    #[serde(skip)]
    embedded_fields: Vec<Vec<String>>,
}

impl UnionEmbed {
    pub fn new(fields: Vec<UnionMapping>) -> Self {
        Self {
            fields,
            embedded_fields: Vec::new(),
        }
    }
}

impl FieldMapper for UnionEmbed {
    fn from_internal(&self, data: &mut Document) {
        for mapping in &self.fields {
            if !data.get(&mapping.field_name).map_or(false, Value::is_object) {
                continue;
            }
            if let Some(value) = data.remove(&mapping.field_name) {
                merge_into(data, value);
                if let Some(marker) = &mapping.marker {
                    data.insert(marker.clone(), Value::Bool(true));
                }
            }
        }
    }

    fn to_internal(&self, data: &mut Document) {
        let selected = self.fields.iter().position(|m| m.selected_by(data));
        for mapping in &self.fields {
            if let Some(marker) = &mapping.marker {
                data.remove(marker);
            }
        }
        if let Some(index) = selected {
            if let Some(keys) = self.embedded_fields.get(index) {
                collect_under(data, &self.fields[index].field_name, keys);
            }
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, registry: &SchemaRegistry) -> Result<()> {
        let mut embedded_fields = Vec::with_capacity(self.fields.len());
        let mut merged = Vec::new();

        for mapping in &self.fields {
            let embedded = embedded_schema("unionEmbed", schema, &mapping.field_name, registry)?;
            for check in &mapping.check_fields {
                if !embedded.has_field(check) && mapping.marker.as_ref() != Some(check) {
                    return Err(SchemaError::invalid_mapper(
                        "unionEmbed",
                        &schema.id,
                        format!("{} does not declare check field {}", mapping.field_name, check),
                    ));
                }
            }
            embedded_fields.push(embedded.resource_fields.keys().cloned().collect());
            merged.extend(embedded.resource_fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        for mapping in &self.fields {
            schema.resource_fields.remove(&mapping.field_name);
            if let Some(marker) = &mapping.marker {
                schema
                    .resource_fields
                    .entry(marker.clone())
                    .or_insert_with(|| Field::scalar("boolean"));
            }
        }
        schema.resource_fields.extend(merged);
        self.embedded_fields = embedded_fields;
        Ok(())
    }
}
