//! Error types for schema_uml

use thiserror::Error;

/// Result type for schema_uml operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_uml
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Table not found: {0}")]
    UnresolvedTable(String),

    #[error("Column not found: {table}.{column}")]
    UnresolvedColumn { table: String, column: String },

    #[error("Invalid table pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to render template for {entity}: {message}")]
    TemplateError { entity: String, message: String },

    #[error("Rasterization error: {0}")]
    RasterizeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl Error {
    /// Build an unresolved-column error for `table.column`
    pub fn unresolved_column(table: &str, column: &str) -> Self {
        Error::UnresolvedColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Convert TOML deserialization errors to schema_uml errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
