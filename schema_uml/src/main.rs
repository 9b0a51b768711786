use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use schema_uml::config::{self, Config, LoggingConfig};
use schema_uml::utils::logging::init_logging;
use schema_uml::SchemaUmlClient;

/// Draw a database schema as a PlantUML entity diagram
#[derive(Parser, Debug)]
#[command(name = "schema_uml", version, about)]
struct Cli {
    /// Database connection URL
    conn: Option<String>,

    /// Database driver: postgres, mysql or sqlite
    #[arg(short = 'd', long)]
    driver: Option<String>,

    /// PostgreSQL schema or MySQL database
    #[arg(short = 's', long)]
    schema: Option<String>,

    /// Write the diagram here instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Keep only tables matching this pattern (repeatable)
    #[arg(short = 't', long = "table")]
    tables: Vec<String>,

    /// Drop tables matching this pattern (repeatable)
    #[arg(short = 'x', long = "exclude")]
    excludes: Vec<String>,

    /// Diagram title
    #[arg(short = 'T', long)]
    title: Option<String>,

    /// Render SVG through the diagram server instead of emitting PlantUML text
    #[arg(long)]
    svg: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not guess relations from column names
    #[arg(long)]
    no_infer: bool,

    /// Log level written to stderr
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load the config file, if any, and lay the command line over it
    fn into_config(self) -> anyhow::Result<(Config, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => config::load_from_file(&path.to_string_lossy())
                .with_context(|| format!("loading {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(conn) = self.conn {
            config.database.url = conn;
        }
        if let Some(driver) = self.driver {
            config.database.driver = driver;
        }
        if self.schema.is_some() {
            config.database.schema = self.schema;
        }
        if !self.tables.is_empty() {
            config.diagram.include = self.tables;
        }
        if !self.excludes.is_empty() {
            config.diagram.exclude = self.excludes;
        }
        if self.title.is_some() {
            config.diagram.title = self.title;
        }
        if self.svg {
            config.render.svg = true;
        }
        if self.no_infer {
            config.diagram.infer_foreign_keys = false;
        }
        if let Some(level) = self.log_level {
            match config.logging.as_mut() {
                Some(logging) => logging.level = level,
                None => config.logging = Some(LoggingConfig::with_level(&level)),
            }
        }

        Ok((config, self.output))
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (config, output) = cli.into_config()?;
    init_logging(&config.logging)?;

    let client = SchemaUmlClient::new(config)
        .await
        .context("connecting to the database")?;
    let document = client.export().await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &document)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = document.len(), "Diagram written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&document)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("schema_uml: {:#}", e);
        std::process::exit(1);
    }
}
