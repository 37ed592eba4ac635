//! Field Transformations
//!
//! A pipeline is an ordered list of [`Mapper`]s. Each mapper rewrites a
//! document in place in two directions:
//!
//! - **outward** (`from_internal`): native shape to user-facing shape
//! - **inward** (`to_internal`): user-facing shape back to native shape
//!
//! and adjusts the user-facing schema once at registration
//! (`modify_schema`). Outward runs a pipeline left to right, inward right
//! to left.
//!
//! Every mapper is total: a missing source is a no-op and a value of the
//! wrong shape leaves the document unchanged.
//!
//! ## Primitives
//! - [`Move`], [`Drop`], [`SetValue`], [`LabelField`]: single fields
//! - [`Embed`], [`UnionEmbed`]: hoisting nested mappings
//! - [`Enum`], [`SliceToMap`], [`PivotMapper`]: value reshaping
//!
//! ## Domain mappers
//! Node, status, workload, container and pod-spec projections built from
//! the same contract.

mod collection;
mod container;
mod embed;
mod field;
mod node;
mod pod;
mod status;
mod workload;

pub use collection::{Enum, PivotMapper, SliceToMap};
pub use container::EnvironmentMapper;
pub use embed::{Embed, UnionEmbed, UnionMapping};
pub use field::{Drop, LabelField, Move, SetValue, LABEL_NAMESPACE};
pub use node::{NodeAddressMapper, OsInfo};
pub use pod::{InitContainerMapper, NamespaceMapper, SchedulingMapper};
pub use status::Status;
pub use workload::{DeploymentStrategyMapper, WorkloadTypeMapper};

use serde::Serialize;

use crate::document::Document;
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::schema::{Field, Schema};

/// The contract every transformation implements
pub trait FieldMapper {
    /// Project a native document outward
    fn from_internal(&self, data: &mut Document);

    /// Reconstruct the native shape from a user-facing document
    fn to_internal(&self, data: &mut Document);

    /// Adjust the user-facing schema the pipeline is attached to
    ///
    /// Runs once, after the native fields and overrides are merged and after
    /// every type the schema refers to has been imported.
    fn modify_schema(&mut self, schema: &mut Schema, registry: &SchemaRegistry) -> Result<()>;
}

/// A transformation in a pipeline
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mapper", rename_all = "camelCase")]
pub enum Mapper {
    Move(Move),
    Drop(Drop),
    SetValue(SetValue),
    LabelField(LabelField),
    Embed(Embed),
    UnionEmbed(UnionEmbed),
    Enum(Enum),
    SliceToMap(SliceToMap),
    Pivot(PivotMapper),
    NodeAddress(NodeAddressMapper),
    OsInfo(OsInfo),
    Status(Status),
    WorkloadType(WorkloadTypeMapper),
    DeploymentStrategy(DeploymentStrategyMapper),
    Environment(EnvironmentMapper),
    Namespace(NamespaceMapper),
    InitContainer(InitContainerMapper),
    Scheduling(SchedulingMapper),
}

impl Mapper {
    fn inner(&self) -> &dyn FieldMapper {
        match self {
            Mapper::Move(m) => m,
            Mapper::Drop(m) => m,
            Mapper::SetValue(m) => m,
            Mapper::LabelField(m) => m,
            Mapper::Embed(m) => m,
            Mapper::UnionEmbed(m) => m,
            Mapper::Enum(m) => m,
            Mapper::SliceToMap(m) => m,
            Mapper::Pivot(m) => m,
            Mapper::NodeAddress(m) => m,
            Mapper::OsInfo(m) => m,
            Mapper::Status(m) => m,
            Mapper::WorkloadType(m) => m,
            Mapper::DeploymentStrategy(m) => m,
            Mapper::Environment(m) => m,
            Mapper::Namespace(m) => m,
            Mapper::InitContainer(m) => m,
            Mapper::Scheduling(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FieldMapper {
        match self {
            Mapper::Move(m) => m,
            Mapper::Drop(m) => m,
            Mapper::SetValue(m) => m,
            Mapper::LabelField(m) => m,
            Mapper::Embed(m) => m,
            Mapper::UnionEmbed(m) => m,
            Mapper::Enum(m) => m,
            Mapper::SliceToMap(m) => m,
            Mapper::Pivot(m) => m,
            Mapper::NodeAddress(m) => m,
            Mapper::OsInfo(m) => m,
            Mapper::Status(m) => m,
            Mapper::WorkloadType(m) => m,
            Mapper::DeploymentStrategy(m) => m,
            Mapper::Environment(m) => m,
            Mapper::Namespace(m) => m,
            Mapper::InitContainer(m) => m,
            Mapper::Scheduling(m) => m,
        }
    }

    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Mapper::Move(_) => "move",
            Mapper::Drop(_) => "drop",
            Mapper::SetValue(_) => "setValue",
            Mapper::LabelField(_) => "labelField",
            Mapper::Embed(_) => "embed",
            Mapper::UnionEmbed(_) => "unionEmbed",
            Mapper::Enum(_) => "enum",
            Mapper::SliceToMap(_) => "sliceToMap",
            Mapper::Pivot(_) => "pivot",
            Mapper::NodeAddress(_) => "nodeAddress",
            Mapper::OsInfo(_) => "osInfo",
            Mapper::Status(_) => "status",
            Mapper::WorkloadType(_) => "workloadType",
            Mapper::DeploymentStrategy(_) => "deploymentStrategy",
            Mapper::Environment(_) => "environment",
            Mapper::Namespace(_) => "namespace",
            Mapper::InitContainer(_) => "initContainer",
            Mapper::Scheduling(_) => "scheduling",
        }
    }

    pub fn from_internal(&self, data: &mut Document) {
        self.inner().from_internal(data)
    }

    pub fn to_internal(&self, data: &mut Document) {
        self.inner().to_internal(data)
    }

    pub fn modify_schema(&mut self, schema: &mut Schema, registry: &SchemaRegistry) -> Result<()> {
        self.inner_mut().modify_schema(schema, registry)
    }
}

macro_rules! impl_from_mapper {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Mapper {
                fn from(mapper: $ty) -> Self {
                    Mapper::$variant(mapper)
                }
            }
        )*
    };
}

impl_from_mapper! {
    Move => Move,
    Drop => Drop,
    SetValue => SetValue,
    LabelField => LabelField,
    Embed => Embed,
    UnionEmbed => UnionEmbed,
    Enum => Enum,
    SliceToMap => SliceToMap,
    Pivot => PivotMapper,
    NodeAddress => NodeAddressMapper,
    OsInfo => OsInfo,
    Status => Status,
    WorkloadType => WorkloadTypeMapper,
    DeploymentStrategy => DeploymentStrategyMapper,
    Environment => EnvironmentMapper,
    Namespace => NamespaceMapper,
    InitContainer => InitContainerMapper,
    Scheduling => SchedulingMapper,
}

/// Apply a pipeline outward, left to right
pub fn apply_from_internal(mappers: &[Mapper], data: &mut Document) {
    for mapper in mappers {
        mapper.from_internal(data);
    }
}

/// Apply a pipeline inward, right to left
pub fn apply_to_internal(mappers: &[Mapper], data: &mut Document) {
    for mapper in mappers.iter().rev() {
        mapper.to_internal(data);
    }
}

/// Fail unless the schema declares `field`
pub(crate) fn require_field<'a>(schema: &'a Schema, field: &str) -> Result<&'a Field> {
    schema
        .field(field)
        .ok_or_else(|| SchemaError::unknown_field(&schema.id, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_pipeline_order_is_inverted_inward() {
        let pipeline: Vec<Mapper> = vec![Move::new("a", "b").into(), Move::new("b", "c").into()];
        let mut data = json!({"a": 1}).as_object().cloned().unwrap();

        apply_from_internal(&pipeline, &mut data);
        assert_eq!(Value::Object(data.clone()), json!({"c": 1}));

        apply_to_internal(&pipeline, &mut data);
        assert_eq!(Value::Object(data), json!({"a": 1}));
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let pipeline: Vec<Mapper> = vec![
            Move::new("replicas", "scale").dest_defined().into(),
            SliceToMap::new("volumes", "name").into(),
            Drop::new("selector").into(),
        ];
        let input = json!({
            "replicas": 3,
            "selector": {"app": "x"},
            "volumes": [{"name": "b", "emptyDir": {}}, {"name": "a"}]
        });

        let mut first = input.as_object().cloned().unwrap();
        let mut second = input.as_object().cloned().unwrap();
        apply_from_internal(&pipeline, &mut first);
        apply_from_internal(&pipeline, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_mapper_serializes_tagged() {
        let mapper: Mapper = Drop::new("selector").into();
        assert_eq!(mapper.name(), "drop");
        assert_eq!(
            serde_json::to_value(&mapper).unwrap(),
            json!({"mapper": "drop", "field": "selector"})
        );
    }
}
