//! Schema Registry
//!
//! Holds every registered schema keyed by API version and schema id.
//! Registration happens once: pipelines are attached to native types,
//! types are imported (reflected from the native catalog and merged with
//! override shapes), and the result is validated. After `finish` the
//! registry is only read.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::document::{get_str, Document, FieldPath};
use crate::error::{Result, SchemaError};
use crate::mapper::Mapper;
use crate::native::NativeCatalog;
use crate::schema::{Field, FieldType, Override, Schema};
use crate::version::ApiVersion;

/// Registry key for the discriminator written by the workload type mapper
pub const TYPE_FIELD: &str = "type";

/// The schema registry
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Upstream shapes available for import
    catalog: NativeCatalog,
    /// Versions by path
    versions: BTreeMap<String, ApiVersion>,
    /// Schemas by version path, then id
    schemas: BTreeMap<String, BTreeMap<String, Schema>>,
    /// Pipelines attached to types not yet imported
    pending_mappers: HashMap<(String, String), Vec<Mapper>>,
    /// Types whose import is in progress
    importing: HashSet<(String, String)>,
}

impl SchemaRegistry {
    /// Create an empty registry importing from `catalog`
    pub fn new(catalog: NativeCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    /// Create an empty registry importing from the embedded catalog
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(NativeCatalog::embedded()?))
    }

    /// Apply one registration step
    pub fn init<F>(mut self, initializer: F) -> Result<Self>
    where
        F: FnOnce(&mut SchemaRegistry) -> Result<()>,
    {
        initializer(&mut self)?;
        Ok(self)
    }

    /// Attach a pipeline to a native type
    ///
    /// Must happen before the type is imported, directly or as a dependency.
    /// Repeated calls append to the pipeline.
    pub fn add_mapper_for_type(
        &mut self,
        version: &ApiVersion,
        id: &str,
        mappers: Vec<Mapper>,
    ) -> Result<&mut Self> {
        if self.schema(version, id).is_some() {
            return Err(SchemaError::MapperAfterImport { name: id.to_string() });
        }
        self.register_version(version);
        tracing::debug!(schema = id, mappers = mappers.len(), "attached pipeline");
        self.pending_mappers
            .entry((version.path.clone(), id.to_string()))
            .or_default()
            .extend(mappers);
        Ok(self)
    }

    /// Import a native type as a schema, layering `overrides` over its fields
    pub fn import(&mut self, version: &ApiVersion, id: &str, overrides: &[Override]) -> Result<&mut Self> {
        self.import_and_customize(version, id, |_| {}, overrides)
    }

    /// Import a native type and adjust the resulting schema before it is stored
    pub fn import_and_customize<F>(
        &mut self,
        version: &ApiVersion,
        id: &str,
        customize: F,
        overrides: &[Override],
    ) -> Result<&mut Self>
    where
        F: FnOnce(&mut Schema),
    {
        if self.schema(version, id).is_some() {
            return Err(SchemaError::DuplicateSchema {
                name: id.to_string(),
                version: version.path.clone(),
            });
        }
        self.import_type(version, id, overrides, Some(Box::new(customize)))?;
        Ok(self)
    }

    /// Validate cross-schema declarations and seal the registry
    pub fn finish(self) -> Result<Self> {
        for (path, schemas) in &self.schemas {
            for schema in schemas.values() {
                if let Some(base) = &schema.base_type {
                    if !schemas.contains_key(base) {
                        return Err(SchemaError::UnknownBaseType {
                            name: schema.id.clone(),
                            base_type: base.clone(),
                            version: path.clone(),
                        });
                    }
                }
            }
        }

        if let Some(((path, id), _)) = self.pending_mappers.iter().next() {
            return Err(SchemaError::UnusedMappers {
                name: id.clone(),
                version: path.clone(),
            });
        }

        for (path, schemas) in &self.schemas {
            tracing::info!(version = %path, schemas = schemas.len(), "schema registry assembled");
        }
        Ok(self)
    }

    /// Get a schema by version and id
    pub fn schema(&self, version: &ApiVersion, id: &str) -> Option<&Schema> {
        self.schemas.get(&version.path)?.get(id)
    }

    /// All schemas of a version, ordered by id
    pub fn schemas(&self, version: &ApiVersion) -> impl Iterator<Item = &Schema> {
        self.schemas.get(&version.path).into_iter().flat_map(|s| s.values())
    }

    /// All registered versions
    pub fn versions(&self) -> impl Iterator<Item = &ApiVersion> {
        self.versions.values()
    }

    /// Number of schemas across all versions
    pub fn len(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Project a native document outward through the schema `id`
    ///
    /// Returns false, leaving the document untouched, if the schema is unknown.
    pub fn from_internal(&self, version: &ApiVersion, id: &str, data: &mut Document) -> bool {
        match self.schema(version, id) {
            Some(schema) => {
                schema.from_internal(data, self);
                true
            }
            None => false,
        }
    }

    /// Reconstruct a native document through the schema `id`
    pub fn to_internal(&self, version: &ApiVersion, id: &str, data: &mut Document) -> bool {
        match self.schema(version, id) {
            Some(schema) => {
                schema.to_internal(data, self);
                true
            }
            None => false,
        }
    }

    /// Schemas declaring `base` as their base type
    pub fn variants(&self, version: &ApiVersion, base: &str) -> Vec<&Schema> {
        self.schemas(version)
            .filter(|s| s.base_type.as_deref() == Some(base))
            .collect()
    }

    /// Pick the variant of `base` a user-facing document belongs to
    ///
    /// Dispatches on the document's `type` field.
    pub fn resolve_variant(&self, version: &ApiVersion, base: &str, data: &Document) -> Option<&Schema> {
        let type_name = get_str(data, &[TYPE_FIELD])?;
        self.schema(version, type_name)
            .filter(|s| s.base_type.as_deref() == Some(base))
    }

    /// Find the field a path names, walking nested object schemas
    pub(crate) fn lookup_field<'a>(&'a self, schema: &'a Schema, path: &FieldPath) -> Option<&'a Field> {
        let mut field = schema.field(path.first())?;
        for segment in &path.segments()[1..] {
            let id = match &field.field_type {
                FieldType::Object(id) => id,
                _ => return None,
            };
            field = self.schema(&schema.version, id)?.field(segment)?;
        }
        Some(field)
    }

    fn register_version(&mut self, version: &ApiVersion) {
        self.versions
            .entry(version.path.clone())
            .or_insert_with(|| version.clone());
    }

    fn import_type(
        &mut self,
        version: &ApiVersion,
        id: &str,
        overrides: &[Override],
        customize: Option<Box<dyn FnOnce(&mut Schema) + '_>>,
    ) -> Result<()> {
        let key = (version.path.clone(), id.to_string());
        if self.schema(version, id).is_some() || !self.importing.insert(key.clone()) {
            return Ok(());
        }

        let built = self.build_schema(version, id, overrides);
        self.importing.remove(&key);
        let mut schema = built?;
        if let Some(customize) = customize {
            customize(&mut schema);
        }

        tracing::debug!(
            schema = id,
            version = %version,
            fields = schema.resource_fields.len(),
            pipeline = schema.mappers.len(),
            "imported schema"
        );
        self.register_version(version);
        self.schemas
            .entry(version.path.clone())
            .or_default()
            .insert(id.to_string(), schema);
        Ok(())
    }

    fn build_schema(&mut self, version: &ApiVersion, id: &str, overrides: &[Override]) -> Result<Schema> {
        let native = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownType(id.to_string()))?;

        let mut schema = Schema::new(id, version.clone());
        for (name, field_type) in native.fields {
            schema.resource_fields.insert(name.clone(), Field::new(field_type.clone()));
            schema.native_fields.insert(name, field_type);
        }
        for shape in overrides {
            for (name, field) in shape.parse()? {
                schema.resource_fields.insert(name, field);
            }
        }

        let mut dependencies: Vec<String> = schema
            .native_fields
            .values()
            .chain(schema.resource_fields.values().map(|f| &f.field_type))
            .filter_map(FieldType::object_id)
            .map(String::from)
            .collect();
        dependencies.sort();
        dependencies.dedup();
        for dependency in dependencies {
            self.import_type(version, &dependency, &[], None)?;
        }

        let mut mappers = self
            .pending_mappers
            .remove(&(version.path.clone(), id.to_string()))
            .unwrap_or_default();
        for mapper in &mut mappers {
            mapper.modify_schema(&mut schema, self)?;
        }
        schema.mappers = mappers;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{Drop, Embed, Move};
    use serde_json::json;

    fn version() -> ApiVersion {
        ApiVersion::new("test.io", "v1", "/v1-test")
    }

    fn catalog() -> NativeCatalog {
        let mut catalog = NativeCatalog::default();
        catalog
            .load_str(
                "test.json",
                r#"{
                    "group": "test/v1",
                    "types": {
                        "outer": {"name": "string", "inner": "inner", "items": "array[inner]"},
                        "inner": {"value": "int", "old": "string"},
                        "base": {"kind": "string"}
                    }
                }"#,
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_import_reflects_dependencies() {
        let v = version();
        let mut registry = SchemaRegistry::new(catalog());
        registry.import(&v, "outer", &[]).unwrap();
        assert!(registry.schema(&v, "outer").is_some());
        assert!(registry.schema(&v, "inner").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_import_rejected() {
        let v = version();
        let mut registry = SchemaRegistry::new(catalog());
        registry.import(&v, "outer", &[]).unwrap();
        let err = registry.import(&v, "inner", &[]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateSchema { .. }));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut registry = SchemaRegistry::new(catalog());
        let err = registry.import(&version(), "missing", &[]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(_)));
    }

    #[test]
    fn test_override_wins() {
        let v = version();
        let mut registry = SchemaRegistry::new(catalog());
        let shape = Override::new().field("name", "reference[node]").field("extra", "boolean");
        registry.import(&v, "outer", &[shape]).unwrap();
        let schema = registry.schema(&v, "outer").unwrap();
        assert_eq!(schema.field("name").unwrap().field_type.to_string(), "reference[node]");
        assert!(schema.has_field("extra"));
    }

    #[test]
    fn test_mapper_after_import_rejected() {
        let v = version();
        let mut registry = SchemaRegistry::new(catalog());
        registry.import(&v, "outer", &[]).unwrap();
        let err = registry
            .add_mapper_for_type(&v, "inner", vec![Drop::new("old").into()])
            .unwrap_err();
        assert!(matches!(err, SchemaError::MapperAfterImport { .. }));
    }

    #[test]
    fn test_unknown_base_type_rejected() {
        let v = version();
        let registry = SchemaRegistry::new(catalog())
            .init(|r| {
                r.import_and_customize(&v, "outer", |s| s.base_type = Some("nope".into()), &[])?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(registry.finish(), Err(SchemaError::UnknownBaseType { .. })));
    }

    #[test]
    fn test_nested_projection_runs_children_first() {
        let v = version();
        let registry = SchemaRegistry::new(catalog())
            .init(|r| {
                r.add_mapper_for_type(&v, "inner", vec![Move::new("old", "renamed").into()])?
                    .add_mapper_for_type(&v, "outer", vec![Embed::new("inner").into()])?
                    .import(&v, "outer", &[])?;
                Ok(())
            })
            .unwrap()
            .finish()
            .unwrap();

        let original = json!({
            "name": "a",
            "inner": {"value": 1, "old": "x"},
            "items": [{"old": "y"}]
        });
        let mut data = original.as_object().cloned().unwrap();
        assert!(registry.from_internal(&v, "outer", &mut data));
        assert_eq!(
            serde_json::Value::Object(data.clone()),
            json!({"name": "a", "value": 1, "renamed": "x", "items": [{"renamed": "y"}]})
        );

        assert!(registry.to_internal(&v, "outer", &mut data));
        assert_eq!(serde_json::Value::Object(data), original);
    }

    #[test]
    fn test_resolve_variant() {
        let v = version();
        let registry = SchemaRegistry::new(catalog())
            .init(|r| {
                r.import(&v, "base", &[])?
                    .import_and_customize(&v, "outer", |s| s.base_type = Some("base".into()), &[])?;
                Ok(())
            })
            .unwrap()
            .finish()
            .unwrap();

        let data = json!({"type": "outer"}).as_object().cloned().unwrap();
        assert_eq!(registry.resolve_variant(&v, "base", &data).unwrap().id, "outer");
        let data = json!({"type": "inner"}).as_object().cloned().unwrap();
        assert!(registry.resolve_variant(&v, "base", &data).is_none());
        assert_eq!(registry.variants(&v, "base").len(), 1);
    }
}
