//! Pods, their specs and containers

use super::{project_override, VERSION};
use crate::error::Result;
use crate::mapper::{
    Drop, Embed, Enum, EnvironmentMapper, InitContainerMapper, Mapper, Move, NamespaceMapper, PivotMapper,
    SchedulingMapper, SliceToMap, Status, UnionEmbed, UnionMapping,
};
use crate::registry::SchemaRegistry;
use crate::schema::Override;

/// Exactly one of exec, tcpSocket and httpGet is set on a handler or probe
fn handler_mapper() -> Mapper {
    UnionEmbed::new(vec![
        UnionMapping::new("exec", &["command"]),
        UnionMapping::marked("tcpSocket", "tcp"),
        UnionMapping::new("httpGet", &["port"]),
    ])
    .into()
}

fn handler_override() -> Override {
    Override::new().field("tcp", "boolean")
}

fn container_override() -> Override {
    Override::new()
        .field("scheduling", "scheduling")
        .field("resources", "map[resourceQuantity]")
        .field("environment", "map[string]")
        .field("environmentFrom", "array[environmentFrom]")
        .field("initContainer", "boolean")
}

fn pod_spec_override() -> Override {
    Override::new()
        .field("nodeName", "reference[node]")
        .field("net", "string")
        .field("pid", "string")
        .field("ipc", "string")
}

pub(super) fn pod_types(schemas: &mut SchemaRegistry) -> Result<()> {
    let version = &*VERSION;
    schemas
        .add_mapper_for_type(version, "podTemplateSpec", vec![Embed::new("spec").into()])?
        .add_mapper_for_type(
            version,
            "capabilities",
            vec![Move::new("add", "capAdd").into(), Move::new("drop", "capDrop").into()],
        )?
        .add_mapper_for_type(
            version,
            "podSecurityContext",
            vec![
                Drop::new("seLinuxOptions").into(),
                Move::new("runAsUser", "uid").into(),
                Move::new("supplementalGroups", "gids").into(),
                Move::new("fsGroup", "fsgid").into(),
            ],
        )?
        .add_mapper_for_type(
            version,
            "securityContext",
            vec![
                Embed::new("capabilities").into(),
                Drop::new("seLinuxOptions").into(),
                Move::new("readOnlyRootFilesystem", "readOnly").into(),
                Move::new("runAsUser", "uid").into(),
            ],
        )?
        .add_mapper_for_type(
            version,
            "container",
            vec![
                Move::new("command", "entrypoint").into(),
                Move::new("args", "command").into(),
                Move::new("livenessProbe", "healthcheck").into(),
                Move::new("readinessProbe", "readycheck").into(),
                Move::new("imagePullPolicy", "pullPolicy").into(),
                // Lossy: inward, literal env entries come back sorted by
                // name, so `$(VAR)` references to later entries can break
                EnvironmentMapper.into(),
                Embed::new("securityContext").into(),
                Embed::new("lifecycle").into(),
            ],
        )?
        .add_mapper_for_type(version, "containerPort", vec![Drop::new("name").into()])?
        .add_mapper_for_type(
            version,
            "volumeMount",
            vec![Enum::new("mountPropagation")
                .value("HostToContainer", &["rslave"])
                .value("Bidirectional", &["rshared", "shared"])
                .into()],
        )?
        .add_mapper_for_type(version, "handler", vec![handler_mapper()])?
        .add_mapper_for_type(version, "probe", vec![handler_mapper()])?
        .add_mapper_for_type(
            version,
            "podStatus",
            vec![Move::new("hostIP", "nodeIp").into(), Move::new("podIP", "podIp").into()],
        )?
        .add_mapper_for_type(
            version,
            "podSpec",
            vec![
                Move::new("restartPolicy", "restart").into(),
                Move::new("imagePullSecrets", "pullSecrets").into(),
                NamespaceMapper.into(),
                InitContainerMapper.into(),
                SchedulingMapper.into(),
                Embed::new("securityContext").into(),
                Drop::new("serviceAccount").into(),
                SliceToMap::new("volumes", "name").into(),
                SliceToMap::new("containers", "name").into(),
                SliceToMap::new("hostAliases", "ip").into(),
            ],
        )?
        .add_mapper_for_type(version, "resourceRequirements", vec![PivotMapper::new(true).into()])?
        .add_mapper_for_type(version, "pod", vec![Status.into()])?
        // Handlers first: container imports them implicitly otherwise
        .import(version, "handler", &[handler_override()])?
        .import(version, "probe", &[handler_override()])?
        .import(version, "container", &[container_override()])?
        .import(version, "podSpec", &[pod_spec_override()])?
        .import(
            version,
            "pod",
            &[project_override(), Override::new().field("workloadId", "reference[workload]")],
        )?;
    Ok(())
}
