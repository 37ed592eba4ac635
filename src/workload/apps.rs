//! Workload kinds and the `workload` parent they share
//!
//! Each kind's spec folds its replica count into `scale` and its rollout
//! settings into `deploymentStrategy`, then flattens the pod template.

use super::{project_override, VERSION, WORKLOAD};
use crate::error::Result;
use crate::mapper::{DeploymentStrategyMapper, Drop, Embed, Move, SetValue, WorkloadTypeMapper};
use crate::registry::SchemaRegistry;
use crate::schema::{Override, Schema};

fn deploy_override() -> Override {
    Override::new()
        .field("scale", "int")
        .field("deploymentStrategy", "deployStrategy")
}

fn scale() -> Move {
    Move::new("replicas", "scale").dest_defined()
}

fn as_workload(schema: &mut Schema) {
    schema.base_type = Some(WORKLOAD.to_string());
}

/// Import a kind's spec with the deploy shape, then the kind itself
fn import_kind(schemas: &mut SchemaRegistry, spec: &str, kind: &str) -> Result<()> {
    let version = &*VERSION;
    schemas
        .add_mapper_for_type(version, kind, vec![WorkloadTypeMapper.into()])?
        .import(version, spec, &[deploy_override()])?
        .import_and_customize(version, kind, as_workload, &[project_override()])?;
    Ok(())
}

pub(super) fn deployment_types(schemas: &mut SchemaRegistry) -> Result<()> {
    schemas.add_mapper_for_type(
        &VERSION,
        "deploymentSpec",
        vec![
            scale().into(),
            Move::new("minReadySeconds", "deploymentStrategy/parallelConfig/minReadySeconds").into(),
            Move::new(
                "progressDeadlineSeconds",
                "deploymentStrategy/parallelConfig/progressDeadlineSeconds",
            )
            .into(),
            DeploymentStrategyMapper.into(),
            Drop::new("selector").into(),
            Drop::new("strategy").into(),
            Embed::new("template").into(),
        ],
    )?;
    import_kind(schemas, "deploymentSpec", "deployment")
}

pub(super) fn stateful_set_types(schemas: &mut SchemaRegistry) -> Result<()> {
    schemas.add_mapper_for_type(
        &VERSION,
        "statefulSetSpec",
        vec![
            scale().into(),
            Move::new(
                "updateStrategy/rollingUpdate/partition",
                "deploymentStrategy/orderedConfig/partition",
            )
            .into(),
            SetValue::new("updateStrategy/type", "OnDelete", true, "deploymentStrategy/orderedConfig/onDelete")
                .into(),
            SetValue::new("podManagementPolicy", "Parallel", "Parallel", "deploymentStrategy/kind").into(),
            SetValue::new("podManagementPolicy", "OrderedReady", "Ordered", "deploymentStrategy/kind").into(),
            Drop::new("selector").into(),
            Embed::new("template").into(),
        ],
    )?;
    // Upstream registers statefulSet without a base type; here it joins the
    // other kinds under `workload`
    import_kind(schemas, "statefulSetSpec", "statefulSet")
}

pub(super) fn replica_set_types(schemas: &mut SchemaRegistry) -> Result<()> {
    schemas.add_mapper_for_type(
        &VERSION,
        "replicaSetSpec",
        vec![
            scale().into(),
            Move::new("minReadySeconds", "deploymentStrategy/parallelConfig/minReadySeconds").into(),
            Drop::new("selector").into(),
            Embed::new("template").into(),
        ],
    )?;
    import_kind(schemas, "replicaSetSpec", "replicaSet")
}

pub(super) fn replication_controller_types(schemas: &mut SchemaRegistry) -> Result<()> {
    schemas.add_mapper_for_type(
        &VERSION,
        "replicationControllerSpec",
        vec![
            scale().into(),
            Move::new("minReadySeconds", "deploymentStrategy/parallelConfig/minReadySeconds").into(),
            Drop::new("selector").into(),
            Embed::new("template").into(),
        ],
    )?;
    import_kind(schemas, "replicationControllerSpec", "replicationController")
}

pub(super) fn daemon_set_types(schemas: &mut SchemaRegistry) -> Result<()> {
    schemas.add_mapper_for_type(
        &VERSION,
        "daemonSetSpec",
        vec![
            SetValue::new("updateStrategy/type", "OnDelete", true, "deploymentStrategy/globalConfig/onDelete")
                .into(),
            Move::new("minReadySeconds", "deploymentStrategy/globalConfig/minReadySeconds").into(),
            Drop::new("selector").into(),
            Embed::new("template").into(),
        ],
    )?;
    import_kind(schemas, "daemonSetSpec", "daemonSet")
}

pub(super) fn workload_types(schemas: &mut SchemaRegistry) -> Result<()> {
    let version = &*VERSION;
    schemas
        .add_mapper_for_type(
            version,
            "workloadSpec",
            vec![Embed::new("deployConfig").into(), Embed::new("template").into()],
        )?
        .add_mapper_for_type(version, WORKLOAD, vec![WorkloadTypeMapper.into()])?
        .import(version, WORKLOAD, &[project_override()])?;
    Ok(())
}
