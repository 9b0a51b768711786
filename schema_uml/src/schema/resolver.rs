//! Foreign key resolution
//!
//! Checks every edge against the loaded table set and marks referencing
//! columns as foreign keys. Runs once, after loading and inference.

use crate::error::{Error, Result};
use crate::schema::types::{
    find_column_by_name, find_column_by_name_mut, require_column, require_table, Table,
};

/// Validate all foreign keys in `tables` and flag their source columns.
///
/// Every edge must name an existing table and column on both ends. The
/// first dangling reference aborts resolution.
pub fn resolve_foreign_keys(tables: &mut [Table]) -> Result<()> {
    let mut referencing = Vec::new();

    let loaded: &[Table] = tables;
    for table in loaded {
        for fk in &table.foreign_keys {
            if fk.source_table != table.name {
                return Err(Error::DatabaseError(format!(
                    "foreign key {} is attached to {} but starts at {}",
                    fk.constraint_name, table.name, fk.source_table
                )));
            }
            require_table(loaded, &fk.target_table)?;
            require_column(loaded, &fk.target_table, &fk.target_column)?;
            require_column(loaded, &fk.source_table, &fk.source_column)?;

            referencing.push((fk.source_table.clone(), fk.source_column.clone()));
        }
    }

    for (table_name, column_name) in &referencing {
        if let Some(column) = find_column_by_name_mut(tables, table_name, column_name) {
            column.is_foreign_key = true;
        }
    }

    tracing::debug!(foreign_keys = referencing.len(), "Resolved foreign keys");
    Ok(())
}

/// Copy primary key flags from the resolved columns onto each edge.
///
/// For engines whose catalog does not report them per constraint. Edges
/// that do not resolve are left alone.
pub fn derive_key_flags(tables: &mut [Table]) {
    let loaded: &[Table] = tables;
    let mut flags = Vec::new();
    for table in loaded {
        let table_flags: Vec<(bool, bool)> = table
            .foreign_keys
            .iter()
            .map(|fk| {
                let source_pk = find_column_by_name(loaded, &fk.source_table, &fk.source_column)
                    .map_or(false, |c| c.is_primary_key);
                let target_pk = find_column_by_name(loaded, &fk.target_table, &fk.target_column)
                    .map_or(false, |c| c.is_primary_key);
                (source_pk, target_pk)
            })
            .collect();
        flags.push(table_flags);
    }

    for (table, table_flags) in tables.iter_mut().zip(flags) {
        for (fk, (source_pk, target_pk)) in table.foreign_keys.iter_mut().zip(table_flags) {
            fk.is_source_column_pk = source_pk;
            fk.is_target_column_pk = target_pk;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Column, ForeignKey};

    fn shop() -> Vec<Table> {
        let mut orders = Table::new("orders")
            .with_column(Column::new(1, "id", "int").primary_key())
            .with_column(Column::new(2, "customer_id", "int"));
        orders.add_foreign_key(ForeignKey::new(
            "orders_customer_fk",
            "orders",
            "customer_id",
            "customers",
            "id",
        ));
        let customers = Table::new("customers").with_column(Column::new(1, "id", "int").primary_key());
        vec![orders, customers]
    }

    #[test]
    fn test_marks_source_column() {
        let mut tables = shop();
        resolve_foreign_keys(&mut tables).unwrap();

        assert!(find_column_by_name(&tables, "orders", "customer_id").unwrap().is_foreign_key);
        assert!(!find_column_by_name(&tables, "orders", "id").unwrap().is_foreign_key);
        assert!(!find_column_by_name(&tables, "customers", "id").unwrap().is_foreign_key);
    }

    #[test]
    fn test_resolving_twice_is_stable() {
        let mut once = shop();
        resolve_foreign_keys(&mut once).unwrap();
        let mut twice = once.clone();
        resolve_foreign_keys(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_target_table() {
        let mut tables = shop();
        tables.remove(1);

        let err = resolve_foreign_keys(&mut tables).unwrap_err();
        assert_eq!(err.to_string(), "Table not found: customers");
    }

    #[test]
    fn test_missing_target_column() {
        let mut tables = shop();
        tables[0].foreign_keys[0].target_column = "uuid".to_string();

        let err = resolve_foreign_keys(&mut tables).unwrap_err();
        assert_eq!(err.to_string(), "Column not found: customers.uuid");
        // nothing is marked when resolution fails
        assert!(!tables[0].columns[1].is_foreign_key);
    }

    #[test]
    fn test_missing_source_column() {
        let mut tables = shop();
        tables[0].foreign_keys[0].source_column = "client_id".to_string();

        let err = resolve_foreign_keys(&mut tables).unwrap_err();
        assert!(matches!(err, Error::UnresolvedColumn { ref table, ref column }
            if table == "orders" && column == "client_id"));
    }

    #[test]
    fn test_derive_key_flags() {
        let mut tables = shop();
        tables[0].columns[1].is_primary_key = true;
        derive_key_flags(&mut tables);

        let fk = &tables[0].foreign_keys[0];
        assert!(fk.is_source_column_pk);
        assert!(fk.is_target_column_pk);
    }
}
