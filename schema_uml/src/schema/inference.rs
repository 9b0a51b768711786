//! Foreign key inference from column naming conventions
//!
//! Fallback for schemas that declare no foreign keys at all. A column
//! `customer_id` is taken to reference `customer.id` (or `customers.id`), or
//! `customer.customer_id` when the key already carries its table's name.
//! Columns that follow neither convention stay unlinked.

use crate::schema::types::{Column, ForeignKey, Table};

/// What [`infer_foreign_keys`] did to the table set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// At least one table already declares a foreign key, nothing was touched
    Skipped,
    /// Inference ran and added this many edges
    Inferred(usize),
}

/// Synthesize foreign keys from column names when none are declared.
///
/// Every pair of tables is tested in both directions, so two tables may end
/// up referencing each other. New edges are appended to the referencing
/// table, in load order.
pub fn infer_foreign_keys(tables: &mut [Table]) -> InferenceOutcome {
    if tables.iter().any(|t| !t.foreign_keys.is_empty()) {
        tracing::debug!("Schema declares foreign keys, skipping inference");
        return InferenceOutcome::Skipped;
    }

    let mut pending: Vec<Vec<ForeignKey>> = vec![Vec::new(); tables.len()];

    for (i, first) in tables.iter().enumerate() {
        for (offset, second) in tables[i + 1..].iter().enumerate() {
            let j = i + 1 + offset;
            pending[j].extend(infer_references(first, second));
            pending[i].extend(infer_references(second, first));
        }
    }

    let mut inferred = 0;
    for (table, fks) in tables.iter_mut().zip(pending) {
        for fk in fks {
            tracing::debug!(
                source = %format!("{}.{}", fk.source_table, fk.source_column),
                target = %format!("{}.{}", fk.target_table, fk.target_column),
                "Inferred foreign key"
            );
            table.add_foreign_key(fk);
            inferred += 1;
        }
    }

    tracing::info!(foreign_keys = inferred, "Inferred foreign keys from column names");
    InferenceOutcome::Inferred(inferred)
}

/// Edges from columns of `referencer` to key columns of `owner`
fn infer_references(owner: &Table, referencer: &Table) -> Vec<ForeignKey> {
    referencer
        .columns
        .iter()
        .filter_map(|column| {
            referenced_key(owner, column).map(|pk| {
                ForeignKey::new(
                    &column.name,
                    &referencer.name,
                    &column.name,
                    &owner.name,
                    &pk.name,
                )
            })
        })
        .collect()
}

/// The first key column of `owner` that `column` refers to by convention.
///
/// A key named after its own table (`customer.customer_id`) is matched by
/// name from any column, including the referencer's own key columns. Any
/// other key (`customer.id`) is matched only from non-key columns spelled
/// `<table>_<key>`, where a plural table name may also appear singular.
fn referenced_key<'a>(owner: &'a Table, column: &Column) -> Option<&'a Column> {
    owner.primary_key_columns().find(|pk| {
        if pk.name.contains(owner.name.as_str()) {
            column.name == pk.name
        } else {
            !column.is_primary_key
                && table_prefixes(&owner.name)
                    .any(|prefix| column.name == format!("{}_{}", prefix, pk.name))
        }
    })
}

/// `name`, plus its singular when it ends in `s`
fn table_prefixes(name: &str) -> impl Iterator<Item = &str> {
    std::iter::once(name).chain(name.strip_suffix('s').filter(|s| !s.is_empty()))
}
