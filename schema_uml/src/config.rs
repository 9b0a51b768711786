//! Configuration handling for schema_uml

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};

/// Default Kroki endpoint used to turn PlantUML text into SVG
pub const DEFAULT_RENDER_SERVER: &str = "https://kroki.io/plantuml/svg";

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete schema_uml configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub diagram: DiagramConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub render: RenderConfig,
    pub logging: Option<LoggingConfig>,
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub url: String,
    /// PostgreSQL schema or MySQL database name
    pub schema: Option<String>,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            url: String::new(),
            schema: None,
            pool_size: None,
            timeout_seconds: None,
        }
    }
}

/// What ends up in the diagram
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiagramConfig {
    pub title: Option<String>,
    /// Table name patterns to keep
    #[serde(default)]
    pub include: Vec<String>,
    /// Table name patterns to drop
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Guess relations from column names when the schema declares none
    #[serde(default = "default_true")]
    pub infer_foreign_keys: bool,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            title: None,
            include: Vec::new(),
            exclude: Vec::new(),
            infer_foreign_keys: true,
        }
    }
}

/// PlantUML fragments used by the renderer.
///
/// `{field}` is a placeholder, `{{` and `}}` are literal braces.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TemplateConfig {
    pub entity_header: String,
    pub comment_block: String,
    pub primary_key_column: String,
    pub separator: String,
    pub column: String,
    pub entity_footer: String,
    pub relation: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            entity_header: "entity \"**{name}**\" {{\n".to_string(),
            comment_block: "  {comment}\n  ..\n".to_string(),
            primary_key_column: "  + \"\"{name}\"\": {ddl_type} [PK]{fk_marker}{comment_suffix}\n"
                .to_string(),
            separator: "  --\n".to_string(),
            column: "  {not_null_marker}\"\"{name}\"\": {ddl_type}{fk_suffix}{comment_suffix}\n"
                .to_string(),
            entity_footer: "}}\n".to_string(),
            relation: "\"**{source_table}**\" {connector} \"**{target_table}**\"\n".to_string(),
        }
    }
}

/// Remote SVG rendering
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default)]
    pub svg: bool,
    #[serde(default = "default_render_server")]
    pub server_url: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            svg: false,
            server_url: default_render_server(),
            timeout_seconds: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub include_timestamps: bool,
}

impl LoggingConfig {
    /// Text logging to stderr at the given level
    pub fn with_level(level: &str) -> Self {
        Self {
            level: level.to_string(),
            file: None,
            format: default_log_format(),
            include_timestamps: true,
        }
    }
}

fn default_driver() -> String {
    "mysql".to_string()
}

fn default_render_server() -> String {
    DEFAULT_RENDER_SERVER.to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}
