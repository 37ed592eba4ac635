//! Error types for schema registration

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema registration errors
///
/// Every variant describes a malformed declaration. Projection itself never
/// fails, so none of these surface once a registry has been built.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema already exists: {name} in {version}")]
    DuplicateSchema { name: String, version: String },

    #[error("Unknown type: {0} is not in the native catalog")]
    UnknownType(String),

    #[error("Unknown base type {base_type} for schema {name} in {version}")]
    UnknownBaseType {
        name: String,
        base_type: String,
        version: String,
    },

    #[error("Unknown field {field} on schema {schema}")]
    UnknownField { schema: String, field: String },

    #[error("Malformed path: {0:?}")]
    MalformedPath(String),

    #[error("Malformed field type: {0:?}")]
    MalformedType(String),

    #[error("Invalid mapper {mapper} on schema {schema}: {reason}")]
    InvalidMapper {
        mapper: &'static str,
        schema: String,
        reason: String,
    },

    #[error("Mappers for {name} attached after it was imported")]
    MapperAfterImport { name: String },

    #[error("Mappers attached to {name} in {version} but the type was never imported")]
    UnusedMappers { name: String, version: String },

    #[error("Invalid native catalog {file}: {reason}")]
    Catalog { file: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn unknown_field(schema: &str, field: impl Into<String>) -> Self {
        SchemaError::UnknownField {
            schema: schema.to_string(),
            field: field.into(),
        }
    }

    pub(crate) fn invalid_mapper(mapper: &'static str, schema: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidMapper {
            mapper,
            schema: schema.to_string(),
            reason: reason.into(),
        }
    }
}
