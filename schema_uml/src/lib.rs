//! schema_uml: draws a database schema as a PlantUML entity diagram
//!
//! schema_uml reads tables, columns and foreign keys from PostgreSQL, MySQL or
//! SQLite, optionally guesses missing relations from column names, and writes
//! PlantUML text or an SVG rendered by a Kroki server.

pub mod config;
pub mod db;
pub mod diagram;
pub mod error;
pub mod schema;
pub mod utils;

#[cfg(test)]
mod test;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use diagram::{render_diagram, DiagramRenderer, Rasterizer};
pub use error::{Error, Result};
pub use schema::{
    filter_tables, infer_foreign_keys, resolve_foreign_keys, Column, ForeignKey,
    InferenceOutcome, SchemaLoader, Table,
};

use config::DiagramConfig;

/// Initialize schema_uml with the specified configuration file
pub async fn init(config_path: &str) -> Result<SchemaUmlClient> {
    let config = config::load_from_file(config_path)?;
    SchemaUmlClient::new(config).await
}

/// Run the relation passes and table filters over a freshly loaded table set.
///
/// Inference runs first (when enabled), then resolution, then the include and
/// exclude filters. Empty pattern lists skip their filter.
pub fn prepare_tables(mut tables: Vec<Table>, config: &DiagramConfig) -> Result<Vec<Table>> {
    if config.infer_foreign_keys {
        infer_foreign_keys(&mut tables);
    }

    resolve_foreign_keys(&mut tables)?;

    if !config.include.is_empty() {
        tables = filter_tables(true, tables, &config.include)?;
    }
    if !config.exclude.is_empty() {
        tables = filter_tables(false, tables, &config.exclude)?;
    }

    tracing::info!(tables = tables.len(), "Tables selected for the diagram");
    Ok(tables)
}

/// The main client for producing diagrams from a live database
pub struct SchemaUmlClient {
    config: Config,
    db_connection: DatabaseConnection,
}

impl SchemaUmlClient {
    /// Create a new client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let db_connection = DatabaseConnection::connect(&config.database).await?;

        Ok(Self {
            config,
            db_connection,
        })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the table definitions of the configured schema
    pub async fn load_tables(&self) -> Result<Vec<Table>> {
        SchemaLoader::new(self.db_connection.clone(), self.config.database.schema.clone())
            .load()
            .await
    }

    /// Load, link, filter and render the schema as PlantUML text
    pub async fn build_diagram(&self) -> Result<Vec<u8>> {
        let tables = prepare_tables(self.load_tables().await?, &self.config.diagram)?;

        let renderer = DiagramRenderer::new(&self.config.templates)?;
        let title = self.config.diagram.title.as_deref().unwrap_or_default();
        renderer.render(&tables, title)
    }

    /// Build the diagram and rasterize it to SVG when `render.svg` is set
    pub async fn export(&self) -> Result<Vec<u8>> {
        let diagram = self.build_diagram().await?;

        if !self.config.render.svg {
            return Ok(diagram);
        }

        Rasterizer::new(&self.config.render)?
            .rasterize(&diagram)
            .await
    }
}
