//! Relationship cardinality

use std::fmt;

use crate::error::Result;
use crate::schema::types::{require_column, require_table, ForeignKey, Table};

/// Cardinality of a foreign key relation, seen from the target table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
}

impl Cardinality {
    /// PlantUML connector between source and target entity
    pub fn connector(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "||-||",
            Cardinality::OneToMany => "}--",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "one-to-one"),
            Cardinality::OneToMany => write!(f, "one-to-many"),
        }
    }
}

/// Classify `fk` against the table set it belongs to
pub fn classify(fk: &ForeignKey, tables: &[Table]) -> Result<Cardinality> {
    if is_one_to_one(fk, tables)? {
        Ok(Cardinality::OneToOne)
    } else {
        Ok(Cardinality::OneToMany)
    }
}

/// True when `fk` links one source row to at most one target row.
///
/// - Both tables composite-keyed: every edge from the source table to the
///   same target must carry key columns on both ends.
/// - Source table with a single-column key: the linked columns must both be
///   primary keys.
/// - Anything else is one-to-many.
pub fn is_one_to_one(fk: &ForeignKey, tables: &[Table]) -> Result<bool> {
    let source = require_table(tables, &fk.source_table)?;
    let target = require_table(tables, &fk.target_table)?;

    if source.is_composite_pk() && target.is_composite_pk() {
        return Ok(source
            .foreign_keys
            .iter()
            .filter(|other| other.target_table == fk.target_table)
            .all(|other| other.is_source_column_pk && other.is_target_column_pk));
    }

    if !source.is_composite_pk() {
        let source_column = require_column(tables, &fk.source_table, &fk.source_column)?;
        let target_column = require_column(tables, &fk.target_table, &fk.target_column)?;
        return Ok(source_column.is_primary_key && target_column.is_primary_key);
    }

    Ok(false)
}
