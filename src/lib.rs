//! Workload Schema Registry
//!
//! The `workload.cattle.io/v1` API surface: user-facing schemas derived
//! from native orchestrator types, and the field transformations that
//! project documents between the two shapes.
//!
//! ## Features
//!
//! - **Reflected Schemas**: Field sets imported from an embedded catalog of
//!   native types, with overrides layered on top
//! - **Bidirectional Pipelines**: Every mapper rewrites documents outward
//!   and inward, and adjusts the schema it is attached to
//! - **Workload Polymorphism**: Each workload kind shares the `workload`
//!   parent and is told apart by its `type` discriminator
//! - **Checksum Validation**: SHA256 fingerprints of the exported registry
//!
//! ## Architecture
//!
//! ```text
//! native catalog ──import──▶ Schema ──modify_schema──▶ user-facing fields
//!                               │
//!       native document ──from_internal──▶ user-facing document
//!       native document ◀──to_internal──── user-facing document
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use workload_schemas::workload::{SCHEMAS, VERSION};
//!
//! let mut spec = json!({"restartPolicy": "Always", "hostNetwork": true})
//!     .as_object()
//!     .cloned()
//!     .unwrap_or_default();
//! SCHEMAS.from_internal(&VERSION, "podSpec", &mut spec);
//! assert_eq!(spec["restart"], json!("Always"));
//! assert_eq!(spec["net"], json!("host"));
//! ```

pub mod checksum;
pub mod config;
pub mod document;
pub mod error;
pub mod mapper;
pub mod native;
pub mod registry;
pub mod schema;
pub mod version;
pub mod workload;

pub use checksum::Checksum;
pub use config::SchemaConfig;
pub use document::{Document, FieldPath};
pub use error::{Result, SchemaError};
pub use mapper::{FieldMapper, Mapper};
pub use native::NativeCatalog;
pub use registry::SchemaRegistry;
pub use schema::{Field, FieldType, Override, Schema};
pub use version::ApiVersion;
