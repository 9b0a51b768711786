//! PlantUML diagram renderer
//!
//! Turns a table set into an entity diagram: one `entity` block per table,
//! one relation line per foreign key, wrapped in `@startuml` / `@enduml`.

use crate::config::TemplateConfig;
use crate::diagram::template::{Template, TemplateContext};
use crate::error::{Error, Result};
use crate::schema::cardinality::{classify, Cardinality};
use crate::schema::types::{Column, ForeignKey, Table};

const TABLE_FIELDS: &[&str] = &["name", "comment"];

const COLUMN_FIELDS: &[&str] = &[
    "name",
    "ordinal",
    "data_type",
    "ddl_type",
    "comment",
    "comment_suffix",
    "pk_marker",
    "fk_marker",
    "fk_suffix",
    "not_null_marker",
];

const RELATION_FIELDS: &[&str] = &[
    "constraint",
    "source_table",
    "source_column",
    "target_table",
    "target_column",
    "connector",
    "cardinality",
];

/// Render `tables` with the default templates
pub fn render_diagram(tables: &[Table], title: &str) -> Result<Vec<u8>> {
    DiagramRenderer::new(&TemplateConfig::default())?.render(tables, title)
}

/// Compiled diagram templates
#[derive(Debug, Clone)]
pub struct DiagramRenderer {
    entity_header: Template,
    comment_block: Template,
    primary_key_column: Template,
    separator: Template,
    column: Template,
    entity_footer: Template,
    relation: Template,
}

impl DiagramRenderer {
    /// Compile the templates in `config`
    pub fn new(config: &TemplateConfig) -> Result<Self> {
        Ok(Self {
            entity_header: compile("entity_header", &config.entity_header, TABLE_FIELDS)?,
            comment_block: compile("comment_block", &config.comment_block, TABLE_FIELDS)?,
            primary_key_column: compile(
                "primary_key_column",
                &config.primary_key_column,
                COLUMN_FIELDS,
            )?,
            separator: compile("separator", &config.separator, TABLE_FIELDS)?,
            column: compile("column", &config.column, COLUMN_FIELDS)?,
            entity_footer: compile("entity_footer", &config.entity_footer, TABLE_FIELDS)?,
            relation: compile("relation", &config.relation, RELATION_FIELDS)?,
        })
    }

    /// Render the full diagram document
    pub fn render(&self, tables: &[Table], title: &str) -> Result<Vec<u8>> {
        let entries = self.render_entries(tables)?;
        let relations = self.render_relations(tables)?;

        let mut src = String::with_capacity(entries.len() + relations.len() + 64);
        src.push_str("@startuml\n");
        if !title.is_empty() {
            src.push_str("title ");
            src.push_str(title);
            src.push('\n');
        }
        src.push_str("hide circle\n");
        src.push_str("skinparam linetype ortho\n");
        src.push_str(&entries);
        src.push_str(&relations);
        src.push_str("@enduml\n");

        tracing::debug!(
            tables = tables.len(),
            bytes = src.len(),
            "Rendered diagram"
        );
        Ok(src.into_bytes())
    }

    /// One entity block per table, in table order
    pub fn render_entries(&self, tables: &[Table]) -> Result<String> {
        let mut out = String::new();
        for table in tables {
            self.render_entry(table, &mut out)
                .map_err(|message| Error::TemplateError {
                    entity: format!("table {}", table.name),
                    message,
                })?;
        }
        Ok(out)
    }

    fn render_entry(&self, table: &Table, out: &mut String) -> std::result::Result<(), String> {
        let context = TableContext(table);

        self.entity_header.render_into(&context, out)?;
        if table.comment.is_some() {
            self.comment_block.render_into(&context, out)?;
        }
        for column in table.columns.iter().filter(|c| c.is_primary_key) {
            self.primary_key_column.render_into(&ColumnContext(column), out)?;
        }
        self.separator.render_into(&context, out)?;
        for column in table.columns.iter().filter(|c| !c.is_primary_key) {
            self.column.render_into(&ColumnContext(column), out)?;
        }
        self.entity_footer.render_into(&context, out)
    }

    /// One relation line per foreign key, tables first, then their keys
    pub fn render_relations(&self, tables: &[Table]) -> Result<String> {
        let mut out = String::new();
        for table in tables {
            for fk in &table.foreign_keys {
                let cardinality = classify(fk, tables)?;
                let context = RelationContext { fk, cardinality };
                self.relation
                    .render_into(&context, &mut out)
                    .map_err(|message| Error::TemplateError {
                        entity: format!("constraint {}", fk.constraint_name),
                        message,
                    })?;
            }
        }
        Ok(out)
    }
}

fn compile(name: &str, source: &str, fields: &[&str]) -> Result<Template> {
    Template::parse_with_fields(source, fields).map_err(|message| Error::TemplateError {
        entity: format!("template {}", name),
        message,
    })
}

struct TableContext<'a>(&'a Table);

impl TemplateContext for TableContext<'_> {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.0.name.clone()),
            "comment" => self.0.comment.clone(),
            _ => None,
        }
    }
}

struct ColumnContext<'a>(&'a Column);

impl TemplateContext for ColumnContext<'_> {
    fn field(&self, name: &str) -> Option<String> {
        let column = self.0;
        let value = match name {
            "name" => column.name.clone(),
            "ordinal" => column.ordinal.to_string(),
            "data_type" => column.data_type.clone(),
            "ddl_type" => column.ddl_type.clone(),
            "comment" => column.comment.clone().unwrap_or_default(),
            "comment_suffix" => column
                .comment
                .as_ref()
                .map(|c| format!(" : {}", c))
                .unwrap_or_default(),
            "pk_marker" => marker(column.is_primary_key, "[PK]"),
            "fk_marker" => marker(column.is_foreign_key, "[FK]"),
            "fk_suffix" => marker(column.is_foreign_key, " [FK]"),
            "not_null_marker" => marker(column.not_null, "*"),
            _ => return None,
        };
        Some(value)
    }
}

struct RelationContext<'a> {
    fk: &'a ForeignKey,
    cardinality: Cardinality,
}

impl TemplateContext for RelationContext<'_> {
    fn field(&self, name: &str) -> Option<String> {
        let fk = self.fk;
        let value = match name {
            "constraint" => fk.constraint_name.clone(),
            "source_table" => fk.source_table.clone(),
            "source_column" => fk.source_column.clone(),
            "target_table" => fk.target_table.clone(),
            "target_column" => fk.target_column.clone(),
            "connector" => self.cardinality.connector().to_string(),
            "cardinality" => self.cardinality.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn marker(set: bool, text: &str) -> String {
    if set {
        text.to_string()
    } else {
        String::new()
    }
}
