//! Workload kind discriminator and rollout strategy projection

use serde::Serialize;
use serde_json::Value;

use super::{require_field, FieldMapper};
use crate::document::{get_str, get_value, lower_first, put_value, remove_value, upper_first, Document};
use crate::error::Result;
use crate::registry::{SchemaRegistry, TYPE_FIELD};
use crate::schema::{Field, Schema};

/// Write the workload kind as the `type` discriminator
///
/// `StatefulSet` becomes `statefulSet`, the id of the schema the
/// document belongs to. Inward the discriminator is removed, restoring
/// `kind` from it when `kind` is absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkloadTypeMapper;

impl FieldMapper for WorkloadTypeMapper {
    fn from_internal(&self, data: &mut Document) {
        if let Some(kind) = get_str(data, &["kind"]) {
            let type_name = lower_first(kind);
            data.insert(TYPE_FIELD.to_string(), Value::String(type_name));
        }
    }

    fn to_internal(&self, data: &mut Document) {
        if let Some(Value::String(type_name)) = data.remove(TYPE_FIELD) {
            data.entry("kind")
                .or_insert_with(|| Value::String(upper_first(&type_name)));
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, "kind")?;
        schema
            .resource_fields
            .insert(TYPE_FIELD.to_string(), Field::scalar("string"));
        Ok(())
    }
}

const STRATEGY: &str = "strategy";
const DEPLOYMENT_STRATEGY: &str = "deploymentStrategy";
const ROLLING_FIELDS: &[&str] = &["maxSurge", "maxUnavailable"];

/// Fold the deployment `strategy` union into `deploymentStrategy`
///
/// `Recreate` keeps its name as the kind. `RollingUpdate` becomes the
/// `Parallel` kind with its surge settings under `parallelConfig`. The
/// native `strategy` block is left for a later drop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentStrategyMapper;

impl FieldMapper for DeploymentStrategyMapper {
    fn from_internal(&self, data: &mut Document) {
        let kind = match get_str(data, &[STRATEGY, "type"]) {
            Some("Recreate") => "Recreate",
            Some("RollingUpdate") => "Parallel",
            _ => return,
        };
        if !put_value(data, &[DEPLOYMENT_STRATEGY, "kind"], Value::String(kind.to_string())) {
            return;
        }
        if kind == "Parallel" {
            for field in ROLLING_FIELDS {
                if let Some(value) = remove_value(data, &[STRATEGY, "rollingUpdate", *field]) {
                    put_value(data, &[DEPLOYMENT_STRATEGY, "parallelConfig", *field], value);
                }
            }
        }
    }

    fn to_internal(&self, data: &mut Document) {
        let strategy_type = match get_str(data, &[DEPLOYMENT_STRATEGY, "kind"]) {
            Some("Recreate") => "Recreate",
            Some("Parallel") => "RollingUpdate",
            _ => return,
        };
        if get_value(data, &[STRATEGY]).map_or(false, |v| !v.is_object()) {
            return;
        }
        remove_value(data, &[DEPLOYMENT_STRATEGY, "kind"]);
        put_value(data, &[STRATEGY, "type"], Value::String(strategy_type.to_string()));
        if strategy_type == "RollingUpdate" {
            for field in ROLLING_FIELDS {
                if let Some(value) = remove_value(data, &[DEPLOYMENT_STRATEGY, "parallelConfig", *field]) {
                    put_value(data, &[STRATEGY, "rollingUpdate", *field], value);
                }
            }
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, STRATEGY)?;
        require_field(schema, DEPLOYMENT_STRATEGY)?;
        Ok(())
    }
}
