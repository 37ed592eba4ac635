//! The `workload.cattle.io/v1` API
//!
//! Pipelines and override shapes for pods, namespaces, nodes, every
//! workload kind and the synthetic `workload` parent, assembled into the
//! process-wide [`SCHEMAS`] registry.

mod apps;
mod namespace;
mod node;
mod pod;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::schema::Override;
use crate::version::ApiVersion;

/// Id of the synthetic parent every workload kind shares its API surface with
pub const WORKLOAD: &str = "workload";

/// The API version every schema here is registered under
pub static VERSION: Lazy<ApiVersion> = Lazy::new(|| {
    ApiVersion::new("workload.cattle.io", "v1", "/v1-workload").with_sub_context("projects")
});

/// The populated registry
///
/// Built on first access. A malformed registration is a programming error
/// and aborts.
pub static SCHEMAS: Lazy<SchemaRegistry> = Lazy::new(|| match build() {
    Ok(registry) => registry,
    Err(e) => panic!("workload schema registration failed: {}", e),
});

/// Build the registry from the embedded native catalog
pub fn build() -> Result<SchemaRegistry> {
    build_with(SchemaRegistry::embedded()?)
}

/// Apply every initializer, in dependency order, to `registry`
pub fn build_with(registry: SchemaRegistry) -> Result<SchemaRegistry> {
    registry
        .init(pod::pod_types)?
        .init(namespace::namespace_types)?
        .init(node::node_types)?
        .init(apps::deployment_types)?
        .init(apps::stateful_set_types)?
        .init(apps::replica_set_types)?
        .init(apps::replication_controller_types)?
        .init(apps::daemon_set_types)?
        .init(apps::workload_types)?
        .finish()
}

/// Project membership, surfaced from the project label
fn project_override() -> Override {
    Override::new().field("projectId", "reference[/v1-management/schemas/project]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION.group, "workload.cattle.io");
        assert_eq!(VERSION.version, "v1");
        assert_eq!(VERSION.path, "/v1-workload");
        assert!(VERSION.has_sub_context("projects"));
    }

    #[test]
    fn test_registry_builds() {
        let registry = build().unwrap();
        for id in [
            "pod",
            "namespace",
            "node",
            "deployment",
            "statefulSet",
            "replicaSet",
            "replicationController",
            "daemonSet",
            WORKLOAD,
        ] {
            assert!(registry.schema(&VERSION, id).is_some(), "{id} missing");
        }
    }

    #[test]
    fn test_global_registry_matches_fresh_build() {
        assert_eq!(SCHEMAS.len(), build().unwrap().len());
    }
}
