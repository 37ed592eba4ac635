//! Nodes
//!
//! The address mapper only reads `addresses`; the drop after it removes
//! the sequence.

use super::VERSION;
use crate::error::Result;
use crate::mapper::{Drop, Embed, NodeAddressMapper, OsInfo, SliceToMap, Status};
use crate::registry::SchemaRegistry;
use crate::schema::Override;

fn node_status_override() -> Override {
    Override::new()
        .field("IpAddress", "string")
        .field("hostname", "string")
        .field("info", "nodeInfo")
}

pub(super) fn node_types(schemas: &mut SchemaRegistry) -> Result<()> {
    let version = &*VERSION;
    schemas
        .add_mapper_for_type(
            version,
            "nodeStatus",
            vec![
                NodeAddressMapper.into(),
                OsInfo.into(),
                Drop::new("addresses").into(),
                Drop::new("daemonEndpoints").into(),
                Drop::new("images").into(),
                Drop::new("nodeInfo").into(),
                SliceToMap::new("volumesAttached", "devicePath").into(),
            ],
        )?
        .add_mapper_for_type(
            version,
            "node",
            vec![Status.into(), Embed::new("status").into(), Drop::new("conditions").into()],
        )?
        .import(version, "nodeStatus", &[node_status_override()])?
        .import(version, "node", &[])?;
    Ok(())
}
