//! Schema module for schema_uml
//!
//! This module loads table definitions and prepares their relations for rendering.

pub mod cardinality;
pub mod filter;
pub mod inference;
pub mod loader;
pub mod resolver;
pub mod types;

// Re-export key types
pub use cardinality::{classify, is_one_to_one, Cardinality};
pub use filter::{filter_tables, TableMatcher};
pub use inference::{infer_foreign_keys, InferenceOutcome};
pub use loader::{Loader, SchemaLoader};
pub use resolver::{derive_key_flags, resolve_foreign_keys};
pub use types::{
    find_column_by_name, find_column_by_name_mut, find_table_by_name, find_table_by_name_mut,
    require_column, require_table, Column, ForeignKey, Table,
};
