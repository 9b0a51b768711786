//! Database schema loader
//!
//! This module reads tables, columns and declared foreign keys from a live
//! database. Each supported engine has its own catalog queries.

use async_trait::async_trait;
use sqlx::{FromRow, MySql, Pool, Postgres, Row, Sqlite};
use std::collections::HashMap;

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::resolver::derive_key_flags;
use crate::schema::types::{Column, ForeignKey, Table};

/// Schema loader trait
#[async_trait]
pub trait Loader {
    /// Load every table with its columns and declared foreign keys, in name order
    async fn load_tables(&self) -> Result<Vec<Table>>;
}

/// Schema loader for database schema introspection
pub struct SchemaLoader {
    connection: DatabaseConnection,
    schema: Option<String>,
}

impl SchemaLoader {
    /// Create a new schema loader.
    ///
    /// `schema` is the PostgreSQL schema (default `public`) or the MySQL
    /// database (default: the connection's current database). SQLite ignores it.
    pub fn new(connection: DatabaseConnection, schema: Option<String>) -> Self {
        Self { connection, schema }
    }

    /// Load the table definitions of the configured schema
    pub async fn load(&self) -> Result<Vec<Table>> {
        let tables = match &self.connection {
            DatabaseConnection::Postgres(pool) => {
                PostgresLoader {
                    pool,
                    schema: self.schema.as_deref().unwrap_or("public"),
                }
                .load_tables()
                .await?
            }
            DatabaseConnection::MySql(pool) => {
                MySqlLoader {
                    pool,
                    schema: self.schema.as_deref(),
                }
                .load_tables()
                .await?
            }
            DatabaseConnection::Sqlite(pool) => SqliteLoader { pool }.load_tables().await?,
        };

        tracing::info!(
            engine = self.connection.engine(),
            tables = tables.len(),
            foreign_keys = tables.iter().map(|t| t.foreign_keys.len()).sum::<usize>(),
            "Loaded table definitions"
        );
        Ok(tables)
    }
}

/// Keep the part of a catalog comment before the first tab, dropping blanks
fn clean_comment(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let text = raw.split('\t').next().unwrap_or_default();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

// Row types for PostgreSQL queries
#[derive(FromRow)]
struct TableRow {
    table_name: String,
    description: Option<String>,
}

#[derive(FromRow)]
struct PgColumnRow {
    field_ordinal: i16,
    column_name: String,
    description: Option<String>,
    data_type: String,
    not_null: bool,
    is_primary_key: bool,
    ddl_type: String,
}

#[derive(FromRow)]
struct PgForeignKeyRow {
    constraint_name: String,
    source_column: String,
    target_table: String,
    target_column: String,
    is_source_pk: bool,
    is_target_pk: bool,
}

/// PostgreSQL schema loader
struct PostgresLoader<'a> {
    pool: &'a Pool<Postgres>,
    schema: &'a str,
}

impl<'a> PostgresLoader<'a> {
    async fn load_columns(&self, table_name: &str) -> Result<Vec<Column>> {
        // serial columns are shown by their pseudo type in the diagram
        let sql = r#"
            SELECT
                a.attnum AS field_ordinal,
                a.attname::text AS column_name,
                pd.description AS description,
                format_type(a.atttypid, a.atttypmod) AS data_type,
                a.attnotnull AS not_null,
                EXISTS (
                    SELECT 1 FROM pg_constraint ct
                    WHERE ct.conrelid = c.oid
                    AND ct.contype = 'p'
                    AND a.attnum = ANY(ct.conkey)
                ) AS is_primary_key,
                CASE WHEN a.atttypid = ANY ('{int,int8,int2}'::regtype[])
                    AND EXISTS (
                        SELECT 1 FROM pg_attrdef ad
                        WHERE ad.adrelid = a.attrelid
                        AND ad.adnum = a.attnum
                        AND pg_get_expr(ad.adbin, ad.adrelid) = 'nextval('''
                            || (pg_get_serial_sequence(a.attrelid::regclass::text, a.attname))::regclass
                            || '''::regclass)'
                    )
                THEN CASE a.atttypid
                    WHEN 'int'::regtype THEN 'serial'
                    WHEN 'int8'::regtype THEN 'bigserial'
                    WHEN 'int2'::regtype THEN 'smallserial'
                END
                ELSE format_type(a.atttypid, a.atttypmod)
                END AS ddl_type
            FROM pg_attribute a
            JOIN ONLY pg_class c ON c.oid = a.attrelid
            JOIN ONLY pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_description pd ON pd.objoid = a.attrelid AND pd.objsubid = a.attnum
            WHERE a.attisdropped = false
            AND n.nspname = $1
            AND c.relname = $2
            AND a.attnum > 0
            ORDER BY a.attnum
        "#;

        let rows = sqlx::query_as::<_, PgColumnRow>(sql)
            .bind(self.schema)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Column {
                ordinal: i32::from(row.field_ordinal),
                name: row.column_name,
                comment: clean_comment(row.description),
                data_type: row.data_type,
                ddl_type: row.ddl_type,
                not_null: row.not_null,
                is_primary_key: row.is_primary_key,
                is_foreign_key: false,
            })
            .collect())
    }

    async fn load_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                con.conname::text AS constraint_name,
                src.attname::text AS source_column,
                tgt_class.relname::text AS target_table,
                tgt.attname::text AS target_column,
                EXISTS (
                    SELECT 1 FROM pg_index pi
                    WHERE pi.indrelid = con.conrelid
                    AND pi.indisprimary
                    AND src.attnum = ANY(pi.indkey)
                ) AS is_source_pk,
                EXISTS (
                    SELECT 1 FROM pg_index pi
                    WHERE pi.indrelid = con.confrelid
                    AND pi.indisprimary
                    AND tgt.attnum = ANY(pi.indkey)
                ) AS is_target_pk
            FROM (
                SELECT
                    c.conname,
                    c.conrelid,
                    c.confrelid,
                    unnest(c.conkey) AS source_attnum,
                    unnest(c.confkey) AS target_attnum
                FROM pg_constraint c
                JOIN pg_class cl ON cl.oid = c.conrelid
                JOIN pg_namespace ns ON ns.oid = cl.relnamespace
                WHERE ns.nspname = $1
                AND cl.relname = $2
                AND c.contype = 'f'
                AND (coalesce((row_to_json(c)->>'conparentid'), '0')::oid) = 0
            ) con
            JOIN pg_attribute src ON src.attrelid = con.conrelid AND src.attnum = con.source_attnum
            JOIN pg_attribute tgt ON tgt.attrelid = con.confrelid AND tgt.attnum = con.target_attnum
            JOIN pg_class tgt_class ON tgt_class.oid = con.confrelid
            ORDER BY con.conname, src.attnum
        "#;

        let rows = sqlx::query_as::<_, PgForeignKeyRow>(sql)
            .bind(self.schema)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                ForeignKey::new(
                    &row.constraint_name,
                    table_name,
                    &row.source_column,
                    &row.target_table,
                    &row.target_column,
                )
                .key_flags(row.is_source_pk, row.is_target_pk)
            })
            .collect())
    }
}

#[async_trait]
impl<'a> Loader for PostgresLoader<'a> {
    async fn load_tables(&self) -> Result<Vec<Table>> {
        // ordinary and partitioned tables, but not the partitions themselves
        let sql = r#"
            SELECT
                c.relname::text AS table_name,
                pd.description AS description
            FROM pg_class c
            JOIN ONLY pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_description pd ON pd.objoid = c.oid AND pd.objsubid = 0
            WHERE n.nspname = $1
            AND c.relkind IN ('r', 'p')
            AND NOT COALESCE((row_to_json(c)->>'relispartition')::boolean, false)
            ORDER BY c.relname
        "#;

        let table_rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(self.schema)
            .fetch_all(self.pool)
            .await?;

        let mut tables = Vec::with_capacity(table_rows.len());
        for row in table_rows {
            let mut table = Table::new(&row.table_name);
            table.comment = clean_comment(row.description);
            table.columns = self.load_columns(&row.table_name).await?;
            tables.push(table);
        }

        for table in tables.iter_mut() {
            table.foreign_keys = self.load_foreign_keys(&table.name).await?;
        }

        Ok(tables)
    }
}

// Row types for MySQL queries
#[derive(FromRow)]
struct MySqlColumnRow {
    field_ordinal: i64,
    column_name: String,
    description: Option<String>,
    data_type: String,
    column_key: Option<String>,
    is_nullable: String,
}

#[derive(FromRow)]
struct MySqlForeignKeyRow {
    constraint_name: String,
    source_column: String,
    target_table: String,
    target_column: String,
}

/// MySQL schema loader
struct MySqlLoader<'a> {
    pool: &'a Pool<MySql>,
    schema: Option<&'a str>,
}

impl<'a> MySqlLoader<'a> {
    async fn database_name(&self) -> Result<String> {
        if let Some(schema) = self.schema {
            return Ok(schema.to_string());
        }

        let name: Option<String> = sqlx::query_scalar("SELECT DATABASE()")
            .fetch_one(self.pool)
            .await?;

        name.ok_or_else(|| {
            Error::DatabaseError("No database selected, pass one in the URL or as schema".to_string())
        })
    }

    async fn load_columns(&self, database: &str, table_name: &str) -> Result<Vec<Column>> {
        let sql = r#"
            SELECT
                CAST(ORDINAL_POSITION AS SIGNED) AS field_ordinal,
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_COMMENT AS CHAR) AS description,
                CAST(COLUMN_TYPE AS CHAR) AS data_type,
                CAST(COLUMN_KEY AS CHAR) AS column_key,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query_as::<_, MySqlColumnRow>(sql)
            .bind(database)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Column {
                    ordinal: ordinal(row.field_ordinal, table_name, &row.column_name)?,
                    name: row.column_name,
                    comment: clean_comment(row.description),
                    ddl_type: row.data_type.clone(),
                    data_type: row.data_type,
                    not_null: row.is_nullable != "YES",
                    is_primary_key: row.column_key.as_deref() == Some("PRI"),
                    is_foreign_key: false,
                })
            })
            .collect()
    }

    async fn load_foreign_keys(&self, database: &str, table_name: &str) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                CAST(CONSTRAINT_NAME AS CHAR) AS constraint_name,
                CAST(COLUMN_NAME AS CHAR) AS source_column,
                CAST(REFERENCED_TABLE_NAME AS CHAR) AS target_table,
                CAST(REFERENCED_COLUMN_NAME AS CHAR) AS target_column
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ?
            AND TABLE_NAME = ?
            AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;

        let rows = sqlx::query_as::<_, MySqlForeignKeyRow>(sql)
            .bind(database)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                ForeignKey::new(
                    &row.constraint_name,
                    table_name,
                    &row.source_column,
                    &row.target_table,
                    &row.target_column,
                )
            })
            .collect())
    }
}

#[async_trait]
impl<'a> Loader for MySqlLoader<'a> {
    async fn load_tables(&self) -> Result<Vec<Table>> {
        let database = self.database_name().await?;

        let sql = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR) AS table_name,
                CAST(TABLE_COMMENT AS CHAR) AS description
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ?
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let table_rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(&database)
            .fetch_all(self.pool)
            .await?;

        let mut tables = Vec::with_capacity(table_rows.len());
        for row in table_rows {
            let mut table = Table::new(&row.table_name);
            table.comment = clean_comment(row.description);
            table.columns = self.load_columns(&database, &row.table_name).await?;
            tables.push(table);
        }

        for table in tables.iter_mut() {
            table.foreign_keys = self.load_foreign_keys(&database, &table.name).await?;
        }

        // the catalog has no per-edge key information
        derive_key_flags(&mut tables);
        Ok(tables)
    }
}

/// SQLite schema loader
struct SqliteLoader<'a> {
    pool: &'a Pool<Sqlite>,
}

impl<'a> SqliteLoader<'a> {
    async fn load_columns(&self, table_name: &str) -> Result<Vec<Column>> {
        let pragma = format!("PRAGMA table_info({})", quote_identifier(table_name));
        let rows = sqlx::query(&pragma).fetch_all(self.pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let cid: i64 = row.try_get("cid")?;
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let pk: i64 = row.try_get("pk")?;

            let mut column = Column::new(ordinal(cid + 1, table_name, &name)?, &name, &data_type);
            column.not_null = notnull != 0;
            column.is_primary_key = pk > 0;
            columns.push(column);
        }
        Ok(columns)
    }

    /// Key column names in `PRIMARY KEY (...)` order, which may differ from column order
    async fn primary_key_order(&self, table_name: &str) -> Result<Vec<String>> {
        let pragma = format!("PRAGMA table_info({})", quote_identifier(table_name));
        let rows = sqlx::query(&pragma).fetch_all(self.pool).await?;

        let mut keys = Vec::new();
        for row in rows {
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                keys.push((pk, row.try_get::<String, _>("name")?));
            }
        }
        keys.sort_by_key(|(pk, _)| *pk);
        Ok(keys.into_iter().map(|(_, name)| name).collect())
    }

    async fn load_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let pragma = format!("PRAGMA foreign_key_list({})", quote_identifier(table_name));
        let rows = sqlx::query(&pragma).fetch_all(self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let seq: i64 = row.try_get("seq")?;
            let target_table: String = row.try_get("table")?;
            let from: String = row.try_get("from")?;
            let to: Option<String> = row.try_get("to")?;
            entries.push((id, seq, target_table, from, to));
        }
        entries.sort_by_key(|(id, seq, ..)| (*id, *seq));

        let mut parent_keys: HashMap<String, Vec<String>> = HashMap::new();
        let mut fks = Vec::with_capacity(entries.len());
        for (id, seq, target_table, from, to) in entries {
            let constraint_name = format!("{}_fk{}", table_name, id);

            // `REFERENCES parent` without a column list points at the parent's key
            let target_column = match to {
                Some(to) => to,
                None => {
                    if !parent_keys.contains_key(&target_table) {
                        let keys = self.primary_key_order(&target_table).await?;
                        parent_keys.insert(target_table.clone(), keys);
                    }
                    usize::try_from(seq)
                        .ok()
                        .and_then(|seq| parent_keys.get(&target_table)?.get(seq).cloned())
                        .ok_or_else(|| {
                            Error::DatabaseError(format!(
                                "Foreign key {} references {} beyond its primary key",
                                constraint_name, target_table
                            ))
                        })?
                }
            };

            fks.push(ForeignKey::new(
                &constraint_name,
                table_name,
                &from,
                &target_table,
                &target_column,
            ));
        }
        Ok(fks)
    }
}

#[async_trait]
impl<'a> Loader for SqliteLoader<'a> {
    async fn load_tables(&self) -> Result<Vec<Table>> {
        let sql = r#"
            SELECT name AS table_name, NULL AS description
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;
        let table_rows = sqlx::query_as::<_, TableRow>(sql)
            .fetch_all(self.pool)
            .await?;

        let mut tables = Vec::with_capacity(table_rows.len());
        for row in table_rows {
            let mut table = Table::new(&row.table_name);
            table.columns = self.load_columns(&row.table_name).await?;
            tables.push(table);
        }

        for table in tables.iter_mut() {
            table.foreign_keys = self.load_foreign_keys(&table.name).await?;
        }

        derive_key_flags(&mut tables);
        Ok(tables)
    }
}

/// Convert a catalog ordinal position, rejecting values outside `i32`
fn ordinal(position: i64, table_name: &str, column_name: &str) -> Result<i32> {
    i32::try_from(position).map_err(|_| {
        Error::DatabaseError(format!(
            "Ordinal position {} of {}.{} is out of range",
            position, table_name, column_name
        ))
    })
}

/// Double-quote an identifier for use in a PRAGMA
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
