use super::{project_override, VERSION};
use crate::error::Result;
use crate::mapper::{Drop, LabelField};
use crate::registry::SchemaRegistry;
use crate::schema::Override;

fn namespace_override() -> Override {
    Override::new()
        .field("templates", "map[string]")
        .field("answers", "map[json]")
        .field("prune", "boolean")
        .field("externalId", "string")
        .field("tags", "array[string]")
}

pub(super) fn namespace_types(schemas: &mut SchemaRegistry) -> Result<()> {
    let version = &*VERSION;
    schemas
        .add_mapper_for_type(version, "namespaceStatus", vec![Drop::new("phase").into()])?
        .add_mapper_for_type(version, "namespaceSpec", vec![Drop::new("finalizers").into()])?
        .add_mapper_for_type(version, "namespace", vec![LabelField::new("projectId").into()])?
        .import(version, "namespace", &[project_override(), namespace_override()])?;
    Ok(())
}
