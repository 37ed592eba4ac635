//! Condition-driven resource state

use serde::Serialize;
use serde_json::Value;

use super::{require_field, FieldMapper};
use crate::document::{get_slice, get_str, Document};
use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::schema::{Field, Schema};

const STATE: &str = "state";
const TRANSITIONING: &str = "transitioning";
const MESSAGE: &str = "message";

/// Phases after which conditions no longer matter
const TERMINAL_PHASES: &[&str] = &["Succeeded", "Failed"];

/// Conditions that signal a fault when True
const FAULT_CONDITIONS: &[&str] = &[
    "OutOfDisk",
    "MemoryPressure",
    "DiskPressure",
    "PIDPressure",
    "NetworkUnavailable",
    "ReplicaFailure",
];

/// Lifecycle conditions in the order a resource passes them, with the
/// state reported while each is not yet True
const PROGRESS_CONDITIONS: &[(&str, &str)] = &[
    ("PodScheduled", "scheduling"),
    ("Initialized", "initializing"),
    ("ContainersReady", "starting"),
    ("Ready", "unavailable"),
    ("Available", "updating"),
    ("Progressing", "updating"),
];

#[derive(Debug, PartialEq)]
struct Summary {
    state: String,
    transitioning: bool,
    message: Option<String>,
}

fn condition_message(condition: &Document) -> Option<String> {
    get_str(condition, &["message"])
        .or_else(|| get_str(condition, &["reason"]))
        .filter(|m| !m.is_empty())
        .map(String::from)
}

fn summarize(status: &Document) -> Summary {
    let phase = get_str(status, &["phase"]);
    let conditions = get_slice(status, &["conditions"]);
    let find = |kind: &str| {
        conditions
            .iter()
            .find(|c| get_str(c, &["type"]) == Some(kind))
            .copied()
    };

    if let Some(phase) = phase.filter(|p| TERMINAL_PHASES.contains(p)) {
        return Summary {
            state: phase.to_lowercase(),
            transitioning: false,
            message: get_str(status, &["message"]).map(String::from),
        };
    }

    for kind in FAULT_CONDITIONS {
        if let Some(condition) = find(*kind).filter(|c| get_str(c, &["status"]) == Some("True")) {
            return Summary {
                state: "error".to_string(),
                transitioning: false,
                message: condition_message(condition),
            };
        }
    }

    for (kind, waiting) in PROGRESS_CONDITIONS {
        let condition = match find(*kind) {
            Some(condition) => condition,
            None => continue,
        };
        let state = match get_str(condition, &["status"]) {
            Some("True") => continue,
            Some("Unknown") => "unknown",
            _ => *waiting,
        };
        return Summary {
            state: state.to_string(),
            transitioning: true,
            message: condition_message(condition),
        };
    }

    Summary {
        state: phase.map_or_else(|| "active".to_string(), str::to_lowercase),
        transitioning: false,
        message: None,
    }
}

/// Summarize `status` into `state`, `transitioning` and `message`
///
/// A terminal phase wins, then any fault condition that is True, then the
/// first lifecycle condition that is not yet True. Otherwise the state is
/// the lowercased phase, or `active`. Inward the three keys are removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Status;

impl FieldMapper for Status {
    fn from_internal(&self, data: &mut Document) {
        let summary = match data.get("status").and_then(Value::as_object) {
            Some(status) => summarize(status),
            None => return,
        };
        data.insert(STATE.to_string(), Value::String(summary.state));
        data.insert(TRANSITIONING.to_string(), Value::Bool(summary.transitioning));
        match summary.message {
            Some(message) => data.insert(MESSAGE.to_string(), Value::String(message)),
            None => data.remove(MESSAGE),
        };
    }

    fn to_internal(&self, data: &mut Document) {
        for key in [STATE, TRANSITIONING, MESSAGE] {
            data.remove(key);
        }
    }

    fn modify_schema(&mut self, schema: &mut Schema, _registry: &SchemaRegistry) -> Result<()> {
        require_field(schema, "status")?;
        for (key, field_type) in [(STATE, "string"), (TRANSITIONING, "boolean"), (MESSAGE, "string")] {
            schema
                .resource_fields
                .entry(key.to_string())
                .or_insert_with(|| Field::scalar(field_type));
        }
        Ok(())
    }
}
