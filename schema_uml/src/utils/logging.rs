//! Logging utilities for schema_uml
//!
//! This module provides logging setup and configuration.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()), // No logging configuration, stay silent
    };

    let level = parse_level(&config.level);

    let directive: Directive = format!("schema_uml={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log level {}: {}", config.level, e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);

    // stdout carries the diagram, so logs go to a file or stderr
    let writer = match &config.file {
        Some(file_path) => {
            if let Some(parent) = Path::new(file_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            BoxMakeWriter::new(Arc::new(File::create(file_path)?))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer);

    let json = config.format.eq_ignore_ascii_case("json");
    let result = match (json, config.include_timestamps) {
        (true, true) => builder.json().try_init(),
        (true, false) => builder.json().without_time().try_init(),
        (false, true) => builder.try_init(),
        (false, false) => builder.without_time().try_init(),
    };

    result.map_err(|e| Error::ConfigError(format!("Failed to initialize logging: {}", e)))
}

/// Parse a level name, falling back to INFO
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
