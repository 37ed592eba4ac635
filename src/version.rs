//! API version descriptors

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An API version a set of schemas is registered under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVersion {
    /// API group (e.g., "workload.cattle.io")
    pub group: String,
    /// Version within the group (e.g., "v1")
    pub version: String,
    /// URL path the version is served under (e.g., "/v1-workload")
    pub path: String,
    /// Path segments resources can be nested under (e.g., "projects")
    #[serde(default)]
    pub sub_contexts: BTreeSet<String>,
}

impl ApiVersion {
    /// Create a new API version without sub-contexts
    pub fn new(group: impl Into<String>, version: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            path: path.into(),
            sub_contexts: BTreeSet::new(),
        }
    }

    /// Add a sub-context
    pub fn with_sub_context(mut self, name: impl Into<String>) -> Self {
        self.sub_contexts.insert(name.into());
        self
    }

    /// Check whether resources may be nested under `name`
    pub fn has_sub_context(&self, name: &str) -> bool {
        self.sub_contexts.contains(name)
    }

    /// Get the "group/version" string (e.g., "workload.cattle.io/v1")
    pub fn group_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
