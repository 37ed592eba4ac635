//! Node status projections

use serde::Serialize;
use serde_json::{json, Value};

use super::{require_field, FieldMapper};
use crate::document::{get_map, get_slice, get_str, Document};
use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::schema::{Field, Schema};

/// Surface the node's internal IP and hostname
///
/// One-way. The `addresses` sequence is left in place for a later drop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeAddressMapper;

impl FieldMapper for NodeAddressMapper {
    fn from_internal(&self, data: &mut Document) {
        let mut found = Vec::new();
        for address in get_slice(data, &["addresses"]) {
            let key = match get_str(address, &["type"]) {
                Some("InternalIP") => "IpAddress",
                Some("Hostname") => "hostname",
                _ => continue,
            };
            if let Some(value) = address.get("address") {
                found.push((key, value.clone()));
            }
        }
        for (key, value) in found {
            data.insert(key.to_string(), value);
        }
    }

    fn to_internal(&self, _data: &mut Document) {}

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, "addresses")?;
        for key in ["IpAddress", "hostname"] {
            schema
                .resource_fields
                .entry(key.to_string())
                .or_insert_with(|| Field::scalar("string"));
        }
        Ok(())
    }
}

/// Flat OS and runtime fields lifted out of `nodeInfo`, with their source keys
const OS_FIELDS: &[(&str, &str)] = &[
    ("operatingSystem", "osImage"),
    ("kernelVersion", "kernelVersion"),
    ("architecture", "architecture"),
    ("dockerVersion", "containerRuntimeVersion"),
    ("kubeletVersion", "kubeletVersion"),
    ("kubeProxyVersion", "kubeProxyVersion"),
];

const RUNTIME_PREFIX: &str = "docker://";

/// Parse a memory quantity into KiB
fn memory_kib(quantity: &str) -> Option<u64> {
    const UNITS: &[(&str, u64)] = &[("Ki", 1), ("Mi", 1 << 10), ("Gi", 1 << 20), ("Ti", 1 << 30)];
    for (suffix, factor) in UNITS {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number.parse::<u64>().ok().and_then(|n| n.checked_mul(*factor));
        }
    }
    quantity.parse::<u64>().ok().map(|bytes| bytes / 1024)
}

/// Lift OS, kernel and runtime versions plus capacity into the node status
///
/// One-way: `nodeInfo` is expected to be dropped after this runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OsInfo;

impl FieldMapper for OsInfo {
    fn from_internal(&self, data: &mut Document) {
        let mut lifted = Document::new();
        if let Some(node_info) = get_map(data, &["nodeInfo"]) {
            for (key, source) in OS_FIELDS {
                if let Some(value) = get_str(node_info, &[source]) {
                    let value = value.strip_prefix(RUNTIME_PREFIX).unwrap_or(value);
                    lifted.insert(key.to_string(), Value::String(value.to_string()));
                }
            }
        }

        let mut info = Document::new();
        if let Some(cpu) = capacity(data, "cpu") {
            info.insert("cpu".to_string(), json!({ "count": cpu }));
        }
        if let Some(kib) = capacity(data, "memory").and_then(|m| memory_kib(&m)) {
            info.insert("memory".to_string(), json!({ "memTotalKiB": kib }));
        }
        if !info.is_empty() {
            lifted.insert("info".to_string(), Value::Object(info));
        }

        data.extend(lifted);
    }

    fn to_internal(&self, _data: &mut Document) {}

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, "nodeInfo")?;
        for (key, _) in OS_FIELDS {
            schema
                .resource_fields
                .entry(key.to_string())
                .or_insert_with(|| Field::scalar("string"));
        }
        schema
            .resource_fields
            .entry("info".to_string())
            .or_insert_with(|| Field::scalar("json"));
        Ok(())
    }
}

/// Read a capacity entry as a string
fn capacity(data: &Document, resource: &str) -> Option<String> {
    match get_map(data, &["capacity"])?.get(resource)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_node_address_mapper() {
        let mut data = doc(json!({
            "addresses": [
                {"type": "InternalIP", "address": "10.0.0.1"},
                {"type": "ExternalIP", "address": "203.0.113.9"},
                {"type": "Hostname", "address": "n1"}
            ]
        }));
        NodeAddressMapper.from_internal(&mut data);
        assert_eq!(data["IpAddress"], json!("10.0.0.1"));
        assert_eq!(data["hostname"], json!("n1"));
        assert!(data.contains_key("addresses"));
    }

    #[test]
    fn test_node_address_mapper_tolerates_garbage() {
        let original = doc(json!({"addresses": "nope"}));
        let mut data = original.clone();
        NodeAddressMapper.from_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_os_info() {
        let mut data = doc(json!({
            "capacity": {"cpu": "4", "memory": "16318712Ki", "pods": "110"},
            "nodeInfo": {
                "osImage": "Ubuntu 16.04.3 LTS",
                "kernelVersion": "4.4.0-98-generic",
                "architecture": "amd64",
                "containerRuntimeVersion": "docker://17.3.2",
                "kubeletVersion": "v1.8.3",
                "kubeProxyVersion": "v1.8.3",
                "operatingSystem": "linux"
            }
        }));
        OsInfo.from_internal(&mut data);
        assert_eq!(data["operatingSystem"], json!("Ubuntu 16.04.3 LTS"));
        assert_eq!(data["dockerVersion"], json!("17.3.2"));
        assert_eq!(data["kubeletVersion"], json!("v1.8.3"));
        assert_eq!(
            data["info"],
            json!({"cpu": {"count": "4"}, "memory": {"memTotalKiB": 16318712}})
        );
    }

    #[test]
    fn test_memory_kib() {
        assert_eq!(memory_kib("2Gi"), Some(2 * 1024 * 1024));
        assert_eq!(memory_kib("512Mi"), Some(512 * 1024));
        assert_eq!(memory_kib("2048"), Some(2));
        assert_eq!(memory_kib("lots"), None);
    }

    #[test]
    fn test_memory_overflow_leaves_memory_unset() {
        assert_eq!(memory_kib("17179869184Ti"), None);

        let mut data = doc(json!({"capacity": {"cpu": "2", "memory": "17179869184Ti"}, "nodeInfo": {}}));
        OsInfo.from_internal(&mut data);
        assert_eq!(data["info"], json!({"cpu": {"count": "2"}}));
    }
}
