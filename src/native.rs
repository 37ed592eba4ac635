//! Native type catalog
//!
//! Upstream type shapes are embedded at compile time from `native/*.json`.
//! Importing a schema reflects one of these shapes, so the catalog plays
//! the part of type reflection.
//!
//! ## File format
//! ```json
//! {
//!   "group": "core/v1",
//!   "types": {
//!     "containerPort": { "name": "string", "containerPort": "int" }
//!   }
//! }
//! ```

use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SchemaError};
use crate::schema::FieldType;

static NATIVE_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/native");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    group: String,
    types: BTreeMap<String, BTreeMap<String, String>>,
}

/// A reflected upstream type
#[derive(Debug, Clone)]
pub struct NativeType {
    pub id: String,
    /// Group the type came from (e.g., "apps/v1beta2")
    pub group: String,
    pub fields: BTreeMap<String, FieldType>,
}

/// All upstream types available for import
#[derive(Debug, Clone, Default)]
pub struct NativeCatalog {
    types: HashMap<String, NativeType>,
}

impl NativeCatalog {
    /// Load the catalog compiled into the crate
    pub fn embedded() -> Result<Self> {
        let mut catalog = Self::default();
        let mut files: Vec<_> = NATIVE_DIR
            .files()
            .filter(|f| f.path().extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));

        for file in files {
            let name = file.path().to_string_lossy().to_string();
            let content = file.contents_utf8().ok_or_else(|| SchemaError::Catalog {
                file: name.clone(),
                reason: "not valid UTF-8".to_string(),
            })?;
            catalog.load_str(&name, content)?;
        }

        tracing::debug!(types = catalog.types.len(), "loaded native catalog");
        Ok(catalog)
    }

    /// Add every type declared in a catalog file
    pub fn load_str(&mut self, file: &str, content: &str) -> Result<()> {
        let parsed: CatalogFile = serde_json::from_str(content).map_err(|e| SchemaError::Catalog {
            file: file.to_string(),
            reason: e.to_string(),
        })?;

        for (id, raw_fields) in parsed.types {
            if self.types.contains_key(&id) {
                return Err(SchemaError::Catalog {
                    file: file.to_string(),
                    reason: format!("type {} declared twice", id),
                });
            }
            let mut fields = BTreeMap::new();
            for (name, ty) in raw_fields {
                fields.insert(name, FieldType::parse(&ty)?);
            }
            self.types.insert(
                id.clone(),
                NativeType {
                    id,
                    group: parsed.group.clone(),
                    fields,
                },
            );
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&NativeType> {
        self.types.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = NativeCatalog::embedded().unwrap();
        let container = catalog.get("container").unwrap();
        assert_eq!(container.group, "core/v1");
        assert_eq!(
            container.fields.get("livenessProbe"),
            Some(&FieldType::Object("probe".into()))
        );
        assert!(catalog.contains("statefulSetSpec"));
        assert!(catalog.contains("workload"));
    }

    #[test]
    fn test_embedded_catalog_references_resolve() {
        let catalog = NativeCatalog::embedded().unwrap();
        for ty in catalog.types.values() {
            for (name, field) in &ty.fields {
                if let Some(id) = field.object_id() {
                    assert!(catalog.contains(id), "{}.{} refers to unknown {}", ty.id, name, id);
                }
            }
        }
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut catalog = NativeCatalog::default();
        let file = r#"{"group": "g", "types": {"a": {"x": "string"}}}"#;
        catalog.load_str("one.json", file).unwrap();
        assert!(matches!(
            catalog.load_str("two.json", file),
            Err(SchemaError::Catalog { .. })
        ));
    }

    #[test]
    fn test_malformed_field_type_rejected() {
        let mut catalog = NativeCatalog::default();
        let file = r#"{"group": "g", "types": {"a": {"x": "array["}}}"#;
        assert!(matches!(
            catalog.load_str("bad.json", file),
            Err(SchemaError::MalformedType(_))
        ));
    }
}
