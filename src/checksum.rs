//! Registry fingerprints for drift detection

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::version::ApiVersion;

/// SHA256 checksum of exported schema content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a JSON value
    ///
    /// Maps serialize with sorted keys, so equal values hash equally.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let canonical = serde_json::to_vec(value)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Fingerprint every schema of a version, pipelines included
    pub fn of_version(registry: &SchemaRegistry, version: &ApiVersion) -> Result<Self> {
        let schemas: Vec<_> = registry.schemas(version).collect();
        Self::from_json(&serde_json::to_value(schemas)?)
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that a JSON value matches this checksum
    pub fn verify_json(&self, value: &serde_json::Value) -> Result<bool> {
        Ok(*self == Self::from_json(value)?)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_consistency() {
        let a = Checksum::from_json(&json!({"id": "pod", "pipeline": []})).unwrap();
        let b = Checksum::from_json(&json!({"pipeline": [], "id": "pod"})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_checksum_different_content() {
        let a = Checksum::from_json(&json!({"id": "pod"})).unwrap();
        let b = Checksum::from_json(&json!({"id": "node"})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_verification() {
        let value = json!({"id": "namespace"});
        let checksum = Checksum::from_json(&value).unwrap();
        assert!(checksum.verify_json(&value).unwrap());
        assert!(!checksum.verify_json(&json!({})).unwrap());
        assert_eq!(Checksum::from(checksum.as_str()), checksum);
    }

    #[test]
    fn test_empty_version_fingerprint() {
        let registry = SchemaRegistry::default();
        let version = ApiVersion::new("test.io", "v1", "/v1-test");
        let checksum = Checksum::of_version(&registry, &version).unwrap();
        assert_eq!(checksum, Checksum::from_json(&json!([])).unwrap());
    }
}
