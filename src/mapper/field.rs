//! Single-field transformations

use serde::Serialize;
use serde_json::Value;

use super::{require_field, FieldMapper};
use crate::document::{get_value, put_value, remove_value, Document, FieldPath};
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::schema::{Field, Schema};

/// Label prefix [`LabelField`] reads and writes
pub const LABEL_NAMESPACE: &str = "field.cattle.io/";

/// Relocate a value from one path to another
///
/// Removing a value prunes the mappings it leaves empty, so a mapping that
/// was already empty before the destination was written under it does not
/// survive the inward trip.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub from: String,
    pub to: String,
    /// The destination is declared by an override; overwrite any value found there
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dest_defined: bool,
}

impl Move {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            dest_defined: false,
        }
    }

    pub fn dest_defined(mut self) -> Self {
        self.dest_defined = true;
        self
    }
}

/// Move the value at `from` to `to`
///
/// Without `overwrite` an occupied destination leaves the document unchanged.
fn relocate(data: &mut Document, from: &str, to: &str, overwrite: bool) {
    let from: Vec<&str> = from.split('/').collect();
    let to: Vec<&str> = to.split('/').collect();

    let value = match get_value(data, &from) {
        Some(value) => value.clone(),
        None => return,
    };
    if !overwrite && get_value(data, &to).is_some() {
        return;
    }
    if put_value(data, &to, value) {
        remove_value(data, &from);
    }
}

impl FieldMapper for Move {
    fn from_internal(&self, data: &mut Document) {
        relocate(data, &self.from, &self.to, self.dest_defined);
    }

    fn to_internal(&self, data: &mut Document) {
        relocate(data, &self.to, &self.from, self.dest_defined);
    }

    fn modify_schema(&mut self, schema: &mut Schema, registry: &SchemaRegistry) -> Result<()> {
        let from = FieldPath::parse(&self.from)?;
        let to = FieldPath::parse(&self.to)?;
        if from.segments().starts_with(to.segments()) || to.segments().starts_with(from.segments()) {
            return Err(SchemaError::invalid_mapper(
                "move",
                &schema.id,
                format!("{} and {} overlap", from, to),
            ));
        }

        let field = registry
            .lookup_field(schema, &from)
            .cloned()
            .ok_or_else(|| SchemaError::unknown_field(&schema.id, from.to_string()))?;

        if to.is_nested() || self.dest_defined {
            if registry.lookup_field(schema, &to).is_none() {
                return Err(SchemaError::unknown_field(&schema.id, to.to_string()));
            }
        } else {
            schema.resource_fields.insert(to.first().to_string(), field);
        }

        if !from.is_nested() {
            schema.resource_fields.remove(from.first());
        }
        Ok(())
    }
}

/// Remove a field
///
/// One-way: the dropped value cannot be recovered inward.
#[derive(Debug, Clone, Serialize)]
pub struct Drop {
    pub field: String,
}

impl Drop {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl FieldMapper for Drop {
    fn from_internal(&self, data: &mut Document) {
        data.remove(&self.field);
    }

    fn to_internal(&self, _data: &mut Document) {}

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, &self.field)?;
        schema.resource_fields.remove(&self.field);
        Ok(())
    }
}

/// Write a constant when a source value matches
///
/// The source is left in place. One-way: inward is a no-op.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetValue {
    pub from: String,
    pub if_eq: Value,
    pub value: Value,
    pub to: String,
}

impl SetValue {
    pub fn new(
        from: impl Into<String>,
        if_eq: impl Into<Value>,
        value: impl Into<Value>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            if_eq: if_eq.into(),
            value: value.into(),
            to: to.into(),
        }
    }
}

impl FieldMapper for SetValue {
    fn from_internal(&self, data: &mut Document) {
        let from: Vec<&str> = self.from.split('/').collect();
        if get_value(data, &from) == Some(&self.if_eq) {
            let to: Vec<&str> = self.to.split('/').collect();
            put_value(data, &to, self.value.clone());
        }
    }

    fn to_internal(&self, _data: &mut Document) {}

    fn modify_schema(&mut self, schema: &mut Schema, registry: &SchemaRegistry) -> Result<()> {
        let from = FieldPath::parse(&self.from)?;
        let to = FieldPath::parse(&self.to)?;
        if registry.lookup_field(schema, &from).is_none() {
            return Err(SchemaError::unknown_field(&schema.id, from.to_string()));
        }
        if registry.lookup_field(schema, &to).is_some() {
            return Ok(());
        }
        if to.is_nested() {
            return Err(SchemaError::unknown_field(&schema.id, to.to_string()));
        }
        let field_type = match self.value {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "int",
            _ => "string",
        };
        schema.resource_fields.insert(to.first().to_string(), Field::scalar(field_type));
        Ok(())
    }
}

/// Surface a `field.cattle.io/` label as a top-level field
#[derive(Debug, Clone, Serialize)]
pub struct LabelField {
    pub field: String,
}

impl LabelField {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }

    fn label_path(&self) -> [String; 3] {
        [
            "metadata".to_string(),
            "labels".to_string(),
            format!("{}{}", LABEL_NAMESPACE, self.field),
        ]
    }
}

impl FieldMapper for LabelField {
    fn from_internal(&self, data: &mut Document) {
        if let Some(value) = remove_value(data, &self.label_path()) {
            data.insert(self.field.clone(), value);
        }
    }

    fn to_internal(&self, data: &mut Document) {
        let value = match data.get(&self.field) {
            Some(value) => value.clone(),
            None => return,
        };
        if put_value(data, &self.label_path(), value) {
            data.remove(&self.field);
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, &self.field)?;
        Ok(())
    }
}
