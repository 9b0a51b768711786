//! Type definitions for database schema objects
//!
//! Foreign keys refer to their tables and columns by name. Use the lookup
//! helpers in this module to get from an edge back to the entities it links.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub comment: Option<String>,
    /// Reserved, loaders never set it
    pub auto_gen_pk: bool,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            comment: None,
            auto_gen_pk: false,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Set the table comment
    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Add a column, builder style
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Add a foreign key to the table
    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.push(fk);
    }

    /// Look up one of this table's columns
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns in ordinal order
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    /// True when two or more columns form the primary key
    pub fn is_composite_pk(&self) -> bool {
        let mut count = 0;
        for column in &self.columns {
            if column.is_primary_key {
                count += 1;
            }
            if count >= 2 {
                return true;
            }
        }
        false
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// 1-based position within the table
    pub ordinal: i32,
    pub name: String,
    pub comment: Option<String>,
    /// Type as reported by the engine
    pub data_type: String,
    /// Type as written in the diagram
    pub ddl_type: String,
    pub not_null: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

impl Column {
    /// Create a new column with the given name and type
    pub fn new(ordinal: i32, name: &str, data_type: &str) -> Self {
        Self {
            ordinal,
            name: name.to_string(),
            comment: None,
            data_type: data_type.to_string(),
            ddl_type: data_type.to_string(),
            not_null: false,
            is_primary_key: false,
            is_foreign_key: false,
        }
    }

    /// Mark the column as part of the primary key
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.not_null = true;
        self
    }

    /// Set whether the column rejects NULL
    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    /// Set the column comment
    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Override the type shown in the diagram
    pub fn ddl_type(mut self, ddl_type: &str) -> Self {
        self.ddl_type = ddl_type.to_string();
        self
    }
}

/// A single-column reference from `source_table.source_column` to
/// `target_table.target_column`.
///
/// Composite constraints are loaded as one edge per key component, all
/// sharing the same constraint name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub source_table: String,
    pub source_column: String,
    pub is_source_column_pk: bool,
    pub target_table: String,
    pub target_column: String,
    pub is_target_column_pk: bool,
}

impl ForeignKey {
    /// Create an edge with both key flags unset
    pub fn new(
        constraint_name: &str,
        source_table: &str,
        source_column: &str,
        target_table: &str,
        target_column: &str,
    ) -> Self {
        Self {
            constraint_name: constraint_name.to_string(),
            source_table: source_table.to_string(),
            source_column: source_column.to_string(),
            is_source_column_pk: false,
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
            is_target_column_pk: false,
        }
    }

    /// Set whether each end of the edge is a primary key column
    pub fn key_flags(mut self, source_pk: bool, target_pk: bool) -> Self {
        self.is_source_column_pk = source_pk;
        self.is_target_column_pk = target_pk;
        self
    }
}

/// Find a table by exact name, first match wins
pub fn find_table_by_name<'a>(tables: &'a [Table], name: &str) -> Option<&'a Table> {
    tables.iter().find(|t| t.name == name)
}

/// Mutable variant of [`find_table_by_name`]
pub fn find_table_by_name_mut<'a>(tables: &'a mut [Table], name: &str) -> Option<&'a mut Table> {
    tables.iter_mut().find(|t| t.name == name)
}

/// Find `table_name.column_name`
pub fn find_column_by_name<'a>(
    tables: &'a [Table],
    table_name: &str,
    column_name: &str,
) -> Option<&'a Column> {
    find_table_by_name(tables, table_name).and_then(|t| t.column(column_name))
}

/// Mutable variant of [`find_column_by_name`]
pub fn find_column_by_name_mut<'a>(
    tables: &'a mut [Table],
    table_name: &str,
    column_name: &str,
) -> Option<&'a mut Column> {
    find_table_by_name_mut(tables, table_name)
        .and_then(|t| t.columns.iter_mut().find(|c| c.name == column_name))
}

/// Like [`find_table_by_name`], failing with the table name
pub fn require_table<'a>(tables: &'a [Table], name: &str) -> Result<&'a Table> {
    find_table_by_name(tables, name).ok_or_else(|| Error::UnresolvedTable(name.to_string()))
}

/// Like [`find_column_by_name`], failing with the qualified column name
pub fn require_column<'a>(
    tables: &'a [Table],
    table_name: &str,
    column_name: &str,
) -> Result<&'a Column> {
    find_column_by_name(tables, table_name, column_name)
        .ok_or_else(|| Error::unresolved_column(table_name, column_name))
}
