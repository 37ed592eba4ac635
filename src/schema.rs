//! Schema types and the nested projection engine

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::document::Document;
use crate::error::{Result, SchemaError};
use crate::mapper::{apply_from_internal, apply_to_internal, Mapper};
use crate::registry::SchemaRegistry;
use crate::version::ApiVersion;

/// Scalar type names a field may carry
pub const SCALAR_TYPES: &[&str] = &[
    "string",
    "int",
    "float",
    "boolean",
    "date",
    "json",
    "intOrString",
    "enum",
    "password",
];

/// The parsed type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A leaf value (`string`, `int`, ...)
    Scalar(String),
    /// A nested object described by another schema
    Object(String),
    /// `array[T]`
    Array(Box<FieldType>),
    /// `map[T]`, string keys
    Map(Box<FieldType>),
    /// `reference[target]`, an id pointing at another resource
    Reference(String),
}

impl FieldType {
    /// Parse a type string such as `array[container]` or `reference[node]`
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(inner) = unwrap_composite(s, "array") {
            return Ok(FieldType::Array(Box::new(Self::parse(inner)?)));
        }
        if let Some(inner) = unwrap_composite(s, "map") {
            return Ok(FieldType::Map(Box::new(Self::parse(inner)?)));
        }
        if let Some(target) = unwrap_composite(s, "reference") {
            if target.is_empty() {
                return Err(SchemaError::MalformedType(s.to_string()));
            }
            return Ok(FieldType::Reference(target.to_string()));
        }
        if SCALAR_TYPES.contains(&s) {
            return Ok(FieldType::Scalar(s.to_string()));
        }
        let is_identifier = s.chars().next().map_or(false, |c| c.is_ascii_lowercase())
            && s.chars().all(|c| c.is_ascii_alphanumeric());
        if is_identifier {
            Ok(FieldType::Object(s.to_string()))
        } else {
            Err(SchemaError::MalformedType(s.to_string()))
        }
    }

    pub fn scalar(name: &str) -> Self {
        FieldType::Scalar(name.to_string())
    }

    /// The object schema this type holds, looking through arrays and maps
    pub fn object_id(&self) -> Option<&str> {
        match self {
            FieldType::Object(id) => Some(id),
            FieldType::Array(inner) | FieldType::Map(inner) => inner.object_id(),
            FieldType::Scalar(_) | FieldType::Reference(_) => None,
        }
    }
}

fn unwrap_composite<'a>(s: &'a str, kind: &str) -> Option<&'a str> {
    s.strip_prefix(kind)?.strip_prefix('[')?.strip_suffix(']')
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(name) | FieldType::Object(name) => write!(f, "{}", name),
            FieldType::Array(inner) => write!(f, "array[{}]", inner),
            FieldType::Map(inner) => write!(f, "map[{}]", inner),
            FieldType::Reference(target) => write!(f, "reference[{}]", target),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A user-visible field of a schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Allowed values for `enum` fields
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Field {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            options: Vec::new(),
        }
    }

    pub fn scalar(name: &str) -> Self {
        Self::new(FieldType::scalar(name))
    }
}

/// Additional user-visible fields layered over a reflected type
///
/// Override fields win over reflected fields of the same name.
#[derive(Debug, Clone, Default)]
pub struct Override {
    fields: Vec<(String, String)>,
}

impl Override {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field by name and type string
    pub fn field(mut self, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        self.fields.push((name.into(), field_type.into()));
        self
    }

    /// Parse every declared field
    pub(crate) fn parse(&self) -> Result<Vec<(String, Field)>> {
        self.fields
            .iter()
            .map(|(name, ty)| Ok((name.clone(), Field::new(FieldType::parse(ty)?))))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A named, versioned projection of a native type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Unique id within the version (e.g., "podSpec")
    pub id: String,
    pub version: ApiVersion,
    /// Parent schema this one shares an API surface with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    /// User-facing fields after overrides and mappers
    pub resource_fields: BTreeMap<String, Field>,
    /// Transformation pipeline, in outward order
    #[serde(rename = "pipeline")]
    pub(crate) mappers: Vec<Mapper>,
    /// Fields of the native shape, used to find nested schemas
    #[serde(skip)]
    pub(crate) native_fields: BTreeMap<String, FieldType>,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Outward,
    Inward,
}

impl Schema {
    /// Create an empty schema
    pub fn new(id: impl Into<String>, version: ApiVersion) -> Self {
        Self {
            id: id.into(),
            version,
            base_type: None,
            resource_fields: BTreeMap::new(),
            mappers: Vec::new(),
            native_fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.resource_fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.resource_fields.contains_key(name)
    }

    pub fn mappers(&self) -> &[Mapper] {
        &self.mappers
    }

    /// Project a native document outward
    ///
    /// Nested object fields are projected first, then the schema's own
    /// pipeline runs left to right.
    pub fn from_internal(&self, data: &mut Document, registry: &SchemaRegistry) {
        self.project(data, registry, Direction::Outward);
    }

    /// Reconstruct a native document from its user-facing form
    ///
    /// The schema's own pipeline runs right to left, then nested object
    /// fields are reconstructed.
    pub fn to_internal(&self, data: &mut Document, registry: &SchemaRegistry) {
        self.project(data, registry, Direction::Inward);
    }

    fn project(&self, data: &mut Document, registry: &SchemaRegistry, direction: Direction) {
        match direction {
            Direction::Outward => {
                self.project_children(data, registry, direction);
                apply_from_internal(&self.mappers, data);
            }
            Direction::Inward => {
                apply_to_internal(&self.mappers, data);
                self.project_children(data, registry, direction);
            }
        }
    }

    fn project_children(&self, data: &mut Document, registry: &SchemaRegistry, direction: Direction) {
        for (name, field_type) in &self.native_fields {
            if let Some(value) = data.get_mut(name) {
                self.project_value(value, field_type, registry, direction);
            }
        }
    }

    fn project_value(
        &self,
        value: &mut Value,
        field_type: &FieldType,
        registry: &SchemaRegistry,
        direction: Direction,
    ) {
        match field_type {
            FieldType::Object(id) => {
                let child = registry.schema(&self.version, id);
                if let (Some(child), Some(map)) = (child, value.as_object_mut()) {
                    child.project(map, registry, direction);
                }
            }
            FieldType::Array(inner) => {
                if let Some(items) = value.as_array_mut() {
                    for item in items {
                        self.project_value(item, inner, registry, direction);
                    }
                }
            }
            FieldType::Map(inner) => {
                if let Some(entries) = value.as_object_mut() {
                    for item in entries.values_mut() {
                        self.project_value(item, inner, registry, direction);
                    }
                }
            }
            FieldType::Scalar(_) | FieldType::Reference(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_types() {
        assert_eq!(FieldType::parse("string").unwrap(), FieldType::scalar("string"));
        assert_eq!(
            FieldType::parse("array[container]").unwrap(),
            FieldType::Array(Box::new(FieldType::Object("container".into())))
        );
        assert_eq!(
            FieldType::parse("map[array[string]]").unwrap().to_string(),
            "map[array[string]]"
        );
        assert_eq!(
            FieldType::parse("reference[/v1-management/schemas/project]").unwrap(),
            FieldType::Reference("/v1-management/schemas/project".into())
        );
    }

    #[test]
    fn test_parse_malformed_types() {
        for bad in ["", "array[", "array[]", "map[string", "reference[]", "Pod", "pod-spec"] {
            assert!(FieldType::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_object_id() {
        assert_eq!(FieldType::parse("map[array[volume]]").unwrap().object_id(), Some("volume"));
        assert_eq!(FieldType::parse("array[string]").unwrap().object_id(), None);
        assert_eq!(FieldType::parse("reference[node]").unwrap().object_id(), None);
    }

    #[test]
    fn test_override_parse() {
        let shape = Override::new().field("scale", "int").field("deploymentStrategy", "deployStrategy");
        let fields = shape.parse().unwrap();
        assert_eq!(fields[0].0, "scale");
        assert_eq!(fields[1].1.field_type, FieldType::Object("deployStrategy".into()));
        assert!(Override::new().field("bad", "array[").parse().is_err());
    }

    #[test]
    fn test_field_serializes_type_string() {
        let field = Field::new(FieldType::parse("map[container]").unwrap());
        assert_eq!(serde_json::to_value(&field).unwrap(), serde_json::json!({"type": "map[container]"}));
    }
}
