//! Container environment projection

use serde::Serialize;
use serde_json::Value;

use super::{require_field, FieldMapper};
use crate::document::{get_map, get_str, Document};
use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::schema::Schema;

const ENV: &str = "env";
const ENV_FROM: &str = "envFrom";
const ENVIRONMENT: &str = "environment";
const ENVIRONMENT_FROM: &str = "environmentFrom";

/// Binding sources backed by a single key of a config map or secret
const KEY_REFS: &[(&str, &str)] = &[("configMap", "configMapKeyRef"), ("secret", "secretKeyRef")];

/// Binding sources importing a whole config map or secret
const SOURCE_REFS: &[(&str, &str)] = &[("configMap", "configMapRef"), ("secret", "secretRef")];

fn copy_key(from: &Document, from_key: &str, to: &mut Document, to_key: &str) {
    if let Some(value) = from.get(from_key) {
        to.insert(to_key.to_string(), value.clone());
    }
}

fn binding(source: &str) -> Document {
    let mut binding = Document::new();
    binding.insert("source".to_string(), Value::String(source.to_string()));
    binding
}

/// Binding for an `env` entry that reads its value from elsewhere
fn env_var_binding(name: &str, value_from: &Document) -> Option<Document> {
    let mut result = if let Some(field_ref) = get_map(value_from, &["fieldRef"]) {
        let mut result = binding("field");
        copy_key(field_ref, "fieldPath", &mut result, "sourceName");
        result
    } else if let Some(resource_ref) = get_map(value_from, &["resourceFieldRef"]) {
        let mut result = binding("resource");
        copy_key(resource_ref, "containerName", &mut result, "sourceName");
        copy_key(resource_ref, "resource", &mut result, "sourceKey");
        result
    } else {
        let (source, key_ref) = KEY_REFS
            .iter()
            .find_map(|(source, key)| Some((*source, get_map(value_from, &[key])?)))?;
        let mut result = binding(source);
        copy_key(key_ref, "name", &mut result, "sourceName");
        copy_key(key_ref, "key", &mut result, "sourceKey");
        copy_key(key_ref, "optional", &mut result, "optional");
        result
    };
    result.insert("targetKey".to_string(), Value::String(name.to_string()));
    Some(result)
}

/// Binding for an `envFrom` entry
fn env_from_binding(entry: &Document) -> Option<Document> {
    let (source, source_ref) = SOURCE_REFS
        .iter()
        .find_map(|(source, key)| Some((*source, get_map(entry, &[key])?)))?;
    let mut result = binding(source);
    copy_key(source_ref, "name", &mut result, "sourceName");
    copy_key(source_ref, "optional", &mut result, "optional");
    copy_key(entry, "prefix", &mut result, "prefix");
    Some(result)
}

/// Rebuild an `env` entry from a binding with a target key
fn env_var_from_binding(binding: &Document) -> Option<Value> {
    let name = get_str(binding, &["targetKey"])?;
    let source = get_str(binding, &["source"])?;

    let mut reference = Document::new();
    let ref_key = match source {
        "field" => {
            copy_key(binding, "sourceName", &mut reference, "fieldPath");
            "fieldRef"
        }
        "resource" => {
            copy_key(binding, "sourceName", &mut reference, "containerName");
            copy_key(binding, "sourceKey", &mut reference, "resource");
            "resourceFieldRef"
        }
        _ => {
            let (_, ref_key) = KEY_REFS.iter().find(|(s, _)| *s == source)?;
            copy_key(binding, "sourceName", &mut reference, "name");
            copy_key(binding, "sourceKey", &mut reference, "key");
            copy_key(binding, "optional", &mut reference, "optional");
            *ref_key
        }
    };

    let mut value_from = Document::new();
    value_from.insert(ref_key.to_string(), Value::Object(reference));
    let mut entry = Document::new();
    entry.insert("name".to_string(), Value::String(name.to_string()));
    entry.insert("valueFrom".to_string(), Value::Object(value_from));
    Some(Value::Object(entry))
}

/// Rebuild an `envFrom` entry from a binding without a target key
fn env_from_from_binding(binding: &Document) -> Option<Value> {
    let source = get_str(binding, &["source"])?;
    let (_, ref_key) = SOURCE_REFS.iter().find(|(s, _)| *s == source)?;

    let mut reference = Document::new();
    copy_key(binding, "sourceName", &mut reference, "name");
    copy_key(binding, "optional", &mut reference, "optional");
    let mut entry = Document::new();
    copy_key(binding, "prefix", &mut entry, "prefix");
    entry.insert(ref_key.to_string(), Value::Object(reference));
    Some(Value::Object(entry))
}

/// Read a sequence, treating absence as empty and any other shape as invalid
fn sequence(data: &Document, key: &str) -> Option<Vec<Value>> {
    match data.get(key) {
        None => Some(Vec::new()),
        Some(Value::Array(items)) => Some(items.clone()),
        Some(_) => None,
    }
}

fn put_nonempty(data: &mut Document, key: &str, value: Value) {
    let empty = match &value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        data.remove(key);
    } else {
        data.insert(key.to_string(), value);
    }
}

/// Split container environment into literal values and indirect bindings
///
/// Literal `env` entries become the `environment` mapping. Entries reading
/// from a field, a resource, a config map key or a secret key, and every
/// `envFrom` source, become `environmentFrom` bindings. Entries without a
/// value and entries of any other shape stay where they were. Inward,
/// literals come first in name order, followed by the entries left in
/// `env`, then bindings in their listed order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvironmentMapper;

impl FieldMapper for EnvironmentMapper {
    fn from_internal(&self, data: &mut Document) {
        let (env, env_from) = match (sequence(data, ENV), sequence(data, ENV_FROM)) {
            (Some(env), Some(env_from)) => (env, env_from),
            _ => return,
        };
        if env.is_empty() && env_from.is_empty() {
            return;
        }

        let mut environment = Document::new();
        let mut bindings = Vec::new();
        let mut kept_env = Vec::new();
        for item in env {
            let entry = match item.as_object() {
                Some(entry) => entry,
                None => {
                    kept_env.push(item.clone());
                    continue;
                }
            };
            let name = match get_str(entry, &["name"]) {
                Some(name) => name,
                None => {
                    kept_env.push(item.clone());
                    continue;
                }
            };
            match get_map(entry, &["valueFrom"]) {
                Some(value_from) => match env_var_binding(name, value_from) {
                    Some(binding) => bindings.push(Value::Object(binding)),
                    None => kept_env.push(item.clone()),
                },
                None => match entry.get("value") {
                    Some(value) => {
                        environment.insert(name.to_string(), value.clone());
                    }
                    None => kept_env.push(item.clone()),
                },
            }
        }

        let mut kept_env_from = Vec::new();
        for item in env_from {
            match item.as_object().and_then(env_from_binding) {
                Some(binding) => bindings.push(Value::Object(binding)),
                None => kept_env_from.push(item),
            }
        }

        put_nonempty(data, ENV, Value::Array(kept_env));
        put_nonempty(data, ENV_FROM, Value::Array(kept_env_from));
        put_nonempty(data, ENVIRONMENT, Value::Object(environment));
        put_nonempty(data, ENVIRONMENT_FROM, Value::Array(bindings));
    }

    fn to_internal(&self, data: &mut Document) {
        let environment = match data.get(ENVIRONMENT) {
            None => Document::new(),
            Some(Value::Object(environment)) => environment.clone(),
            Some(_) => return,
        };
        let (bindings, kept_env, mut env_from) = match (
            sequence(data, ENVIRONMENT_FROM),
            sequence(data, ENV),
            sequence(data, ENV_FROM),
        ) {
            (Some(bindings), Some(kept_env), Some(env_from)) => (bindings, kept_env, env_from),
            _ => return,
        };
        if environment.is_empty() && bindings.is_empty() {
            return;
        }

        let mut env = Vec::with_capacity(environment.len() + kept_env.len());
        for (name, value) in environment {
            let mut entry = Document::new();
            entry.insert("name".to_string(), Value::String(name));
            entry.insert("value".to_string(), value);
            env.push(Value::Object(entry));
        }
        env.extend(kept_env);

        let mut kept = Vec::new();
        for item in bindings {
            let rebuilt = item.as_object().and_then(|binding| {
                if binding.contains_key("targetKey") {
                    env_var_from_binding(binding).map(|v| (ENV, v))
                } else {
                    env_from_from_binding(binding).map(|v| (ENV_FROM, v))
                }
            });
            match rebuilt {
                Some((ENV, entry)) => env.push(entry),
                Some((_, entry)) => env_from.push(entry),
                None => kept.push(item),
            }
        }

        put_nonempty(data, ENV, Value::Array(env));
        put_nonempty(data, ENV_FROM, Value::Array(env_from));
        data.remove(ENVIRONMENT);
        put_nonempty(data, ENVIRONMENT_FROM, Value::Array(kept));
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        for field in [ENV, ENV_FROM, ENVIRONMENT, ENVIRONMENT_FROM] {
            require_field(schema, field)?;
        }
        schema.resource_fields.remove(ENV);
        schema.resource_fields.remove(ENV_FROM);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::{Field, FieldType};
    use crate::version::ApiVersion;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_environment_split() {
        let mut data = doc(json!({
            "image": "nginx",
            "env": [
                {"name": "MODE", "value": "prod"},
                {"name": "POD_IP", "valueFrom": {"fieldRef": {"fieldPath": "status.podIP"}}},
                {"name": "PASSWORD", "valueFrom": {"secretKeyRef": {"name": "db", "key": "pw", "optional": true}}}
            ],
            "envFrom": [{"prefix": "CFG_", "configMapRef": {"name": "settings"}}]
        }));
        EnvironmentMapper.from_internal(&mut data);

        assert_eq!(
            Value::Object(data),
            json!({
                "image": "nginx",
                "environment": {"MODE": "prod"},
                "environmentFrom": [
                    {"source": "field", "sourceName": "status.podIP", "targetKey": "POD_IP"},
                    {"source": "secret", "sourceName": "db", "sourceKey": "pw", "optional": true, "targetKey": "PASSWORD"},
                    {"source": "configMap", "sourceName": "settings", "prefix": "CFG_"}
                ]
            })
        );
    }

    #[test]
    fn test_environment_round_trip() {
        let original = doc(json!({
            "env": [
                {"name": "A", "value": "1"},
                {"name": "B", "value": "2"},
                {"name": "LIMIT", "valueFrom": {"resourceFieldRef": {"containerName": "app", "resource": "limits.cpu"}}},
                {"name": "HOST", "valueFrom": {"configMapKeyRef": {"name": "cfg", "key": "host"}}}
            ],
            "envFrom": [{"secretRef": {"name": "creds", "optional": false}}]
        }));
        let mut data = original.clone();
        EnvironmentMapper.from_internal(&mut data);
        EnvironmentMapper.to_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_unrecognized_binding_stays_in_env() {
        let mut data = doc(json!({
            "env": [{"name": "X", "valueFrom": {"somethingNew": {}}}, {"name": "Y", "value": "y"}]
        }));
        EnvironmentMapper.from_internal(&mut data);
        assert_eq!(data["env"], json!([{"name": "X", "valueFrom": {"somethingNew": {}}}]));
        assert_eq!(data["environment"], json!({"Y": "y"}));
    }

    #[test]
    fn test_entry_without_value_stays_in_env() {
        let original = doc(json!({"env": [{"name": "EMPTY"}, {"name": "MODE", "value": "prod"}]}));
        let mut data = original.clone();
        EnvironmentMapper.from_internal(&mut data);
        assert_eq!(data["env"], json!([{"name": "EMPTY"}]));
        assert_eq!(data["environment"], json!({"MODE": "prod"}));

        EnvironmentMapper.to_internal(&mut data);
        assert_eq!(
            data["env"],
            json!([{"name": "MODE", "value": "prod"}, {"name": "EMPTY"}])
        );
    }

    #[test]
    fn test_literals_come_back_in_name_order() {
        let mut data = doc(json!({"env": [{"name": "B", "value": "1"}, {"name": "A", "value": "$(B)"}]}));
        EnvironmentMapper.from_internal(&mut data);
        EnvironmentMapper.to_internal(&mut data);
        assert_eq!(
            data["env"],
            json!([{"name": "A", "value": "$(B)"}, {"name": "B", "value": "1"}])
        );
    }

    #[test]
    fn test_wrong_shape_unchanged() {
        let original = doc(json!({"env": {"A": "1"}}));
        let mut data = original.clone();
        EnvironmentMapper.from_internal(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_modify_schema_requires_override_fields() {
        let mut schema = Schema::new("container", ApiVersion::new("g", "v1", "/v1-g"));
        schema.resource_fields.insert("env".into(), Field::new(FieldType::parse("array[json]").unwrap()));
        schema.resource_fields.insert("envFrom".into(), Field::new(FieldType::parse("array[json]").unwrap()));
        let err = EnvironmentMapper.modify_schema(&mut schema, &SchemaRegistry::default());
        assert!(matches!(err, Err(SchemaError::UnknownField { .. })));

        schema.resource_fields.insert("environment".into(), Field::new(FieldType::parse("map[string]").unwrap()));
        schema.resource_fields.insert("environmentFrom".into(), Field::new(FieldType::parse("array[json]").unwrap()));
        EnvironmentMapper.modify_schema(&mut schema, &SchemaRegistry::default()).unwrap();
        assert!(!schema.has_field("env"));
        assert!(schema.has_field("environment"));
    }
}
