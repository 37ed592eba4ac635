//! Pod spec projections: host namespaces, init containers, scheduling

use serde::Serialize;
use serde_json::Value;

use super::{require_field, FieldMapper};
use crate::document::{get_value, put_value, remove_value, Document};
use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::schema::{Field, FieldType, Schema};

/// Native host-namespace flags and the user-facing keys they become
const HOST_NAMESPACES: &[(&str, &str)] = &[("hostNetwork", "net"), ("hostPID", "pid"), ("hostIPC", "ipc")];

const HOST: &str = "host";

/// Turn the `hostNetwork`/`hostPID`/`hostIPC` flags into `net`/`pid`/`ipc`
///
/// A true flag becomes `"host"`; a false flag is the default and is
/// dropped. Inward only `"host"` sets a flag.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NamespaceMapper;

impl FieldMapper for NamespaceMapper {
    fn from_internal(&self, data: &mut Document) {
        for (flag, key) in HOST_NAMESPACES {
            match data.get(*flag).and_then(Value::as_bool) {
                Some(true) => {
                    data.remove(*flag);
                    data.insert(key.to_string(), Value::String(HOST.to_string()));
                }
                Some(false) => {
                    data.remove(*flag);
                }
                None => {}
            }
        }
    }

    fn to_internal(&self, data: &mut Document) {
        for (flag, key) in HOST_NAMESPACES {
            if data.get(*key).and_then(Value::as_str) == Some(HOST) {
                data.remove(*key);
                data.insert(flag.to_string(), Value::Bool(true));
            }
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        for (flag, key) in HOST_NAMESPACES {
            require_field(schema, flag)?;
            schema.resource_fields.remove(*flag);
            schema
                .resource_fields
                .entry(key.to_string())
                .or_insert_with(|| Field::scalar("string"));
        }
        Ok(())
    }
}

const CONTAINERS: &str = "containers";
const INIT_CONTAINERS: &str = "initContainers";
const INIT_CONTAINER: &str = "initContainer";

/// Merge `initContainers` into `containers`, flagging each with `initContainer`
///
/// Init containers are placed first. Inward the flag splits them out again.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InitContainerMapper;

impl FieldMapper for InitContainerMapper {
    fn from_internal(&self, data: &mut Document) {
        let init = match data.get(INIT_CONTAINERS) {
            Some(Value::Array(init)) => init,
            _ => return,
        };
        let containers = match data.get(CONTAINERS) {
            None => Vec::new(),
            Some(Value::Array(containers)) => containers.clone(),
            Some(_) => return,
        };
        if init.iter().any(|c| !c.is_object()) {
            return;
        }

        let mut merged: Vec<Value> = init
            .iter()
            .cloned()
            .map(|mut container| {
                if let Some(map) = container.as_object_mut() {
                    map.insert(INIT_CONTAINER.to_string(), Value::Bool(true));
                }
                container
            })
            .collect();
        merged.extend(containers);

        data.remove(INIT_CONTAINERS);
        data.insert(CONTAINERS.to_string(), Value::Array(merged));
    }

    fn to_internal(&self, data: &mut Document) {
        let merged = match data.get_mut(CONTAINERS) {
            Some(Value::Array(merged)) => std::mem::take(merged),
            _ => return,
        };

        let mut init = Vec::new();
        let mut containers = Vec::new();
        for mut container in merged {
            let flagged = container
                .as_object_mut()
                .and_then(|map| map.remove(INIT_CONTAINER))
                .map_or(false, |flag| flag == Value::Bool(true));
            if flagged {
                init.push(container);
            } else {
                containers.push(container);
            }
        }

        data.insert(CONTAINERS.to_string(), Value::Array(containers));
        if !init.is_empty() {
            data.insert(INIT_CONTAINERS.to_string(), Value::Array(init));
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, CONTAINERS)?;
        require_field(schema, INIT_CONTAINERS)?;
        schema.resource_fields.remove(INIT_CONTAINERS);
        Ok(())
    }
}

const SCHEDULING: &str = "scheduling";
const NODE_SELECTOR: &str = "nodeSelector";

/// Native pod spec fields moved as-is under `scheduling`
const SCHEDULING_MOVES: &[(&str, &str)] = &[
    ("tolerations", "tolerate"),
    ("schedulerName", "scheduler"),
    ("priority", "priority"),
    ("priorityClassName", "priorityClassName"),
];

/// Gather node placement settings under `scheduling`
///
/// `nodeSelector` becomes `scheduling/node/requireAll`, a sorted list of
/// `key=value` terms. Tolerations, scheduler and priority move alongside.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulingMapper;

impl FieldMapper for SchedulingMapper {
    fn from_internal(&self, data: &mut Document) {
        if data.get(SCHEDULING).map_or(false, |v| !v.is_object()) {
            return;
        }

        if let Some(Value::Object(selector)) = data.get(NODE_SELECTOR) {
            let terms: Option<Vec<Value>> = selector
                .iter()
                .map(|(key, value)| Some(Value::String(format!("{}={}", key, value.as_str()?))))
                .collect();
            if let Some(terms) = terms {
                data.remove(NODE_SELECTOR);
                if !terms.is_empty() {
                    put_value(data, &[SCHEDULING, "node", "requireAll"], Value::Array(terms));
                }
            }
        }

        for (from, to) in SCHEDULING_MOVES {
            if let Some(value) = data.remove(*from) {
                put_value(data, &[SCHEDULING, *to], value);
            }
        }
    }

    fn to_internal(&self, data: &mut Document) {
        if data.get(SCHEDULING).map_or(true, |v| !v.is_object()) {
            return;
        }

        let terms = get_value(data, &[SCHEDULING, "node", "requireAll"]).and_then(Value::as_array);
        let selector: Option<Document> = terms.and_then(|terms| {
            terms
                .iter()
                .map(|term| {
                    let (key, value) = term.as_str()?.split_once('=')?;
                    Some((key.to_string(), Value::String(value.to_string())))
                })
                .collect()
        });
        if let Some(selector) = selector {
            remove_value(data, &[SCHEDULING, "node", "requireAll"]);
            data.insert(NODE_SELECTOR.to_string(), Value::Object(selector));
        }

        for (from, to) in SCHEDULING_MOVES {
            if let Some(value) = remove_value(data, &[SCHEDULING, *to]) {
                data.insert(from.to_string(), value);
            }
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, NODE_SELECTOR)?;
        schema.resource_fields.remove(NODE_SELECTOR);
        for (from, _) in SCHEDULING_MOVES {
            require_field(schema, from)?;
            schema.resource_fields.remove(*from);
        }
        schema.resource_fields.insert(
            SCHEDULING.to_string(),
            Field::new(FieldType::Object(SCHEDULING.to_string())),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_host_namespaces() {
        let mut data = doc(json!({"hostNetwork": true, "hostPID": false, "dnsPolicy": "ClusterFirst"}));
        NamespaceMapper.from_internal(&mut data);
        assert_eq!(Value::Object(data.clone()), json!({"net": "host", "dnsPolicy": "ClusterFirst"}));

        NamespaceMapper.to_internal(&mut data);
        assert_eq!(Value::Object(data), json!({"hostNetwork": true, "dnsPolicy": "ClusterFirst"}));
    }

    #[test]
    fn test_init_containers_round_trip() {
        let original = doc(json!({
            "initContainers": [{"name": "migrate", "image": "app"}],
            "containers": [{"name": "web", "image": "app"}]
        }));
        let mut data = original.clone();
        InitContainerMapper.from_internal(&mut data);
        assert_eq!(
            data["containers"],
            json!([
                {"name": "migrate", "image": "app", "initContainer": true},
                {"name": "web", "image": "app"}
            ])
        );
        assert!(!data.contains_key("initContainers"));

        InitContainerMapper.to_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_no_init_containers_is_noop() {
        let original = doc(json!({"containers": [{"name": "web"}]}));
        let mut data = original.clone();
        InitContainerMapper.from_internal(&mut data);
        InitContainerMapper.to_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_scheduling_round_trip() {
        let original = doc(json!({
            "nodeSelector": {"zone": "b", "disk": "ssd"},
            "tolerations": [{"key": "dedicated", "operator": "Exists"}],
            "schedulerName": "default-scheduler",
            "priority": 100,
            "restartPolicy": "Always"
        }));
        let mut data = original.clone();
        SchedulingMapper.from_internal(&mut data);
        assert_eq!(
            Value::Object(data.clone()),
            json!({
                "restartPolicy": "Always",
                "scheduling": {
                    "node": {"requireAll": ["disk=ssd", "zone=b"]},
                    "tolerate": [{"key": "dedicated", "operator": "Exists"}],
                    "scheduler": "default-scheduler",
                    "priority": 100
                }
            })
        );

        SchedulingMapper.to_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_scheduling_bad_selector_left_alone() {
        let mut data = doc(json!({"nodeSelector": {"zone": 3}}));
        SchedulingMapper.from_internal(&mut data);
        assert_eq!(Value::Object(data), json!({"nodeSelector": {"zone": 3}}));
    }
}
