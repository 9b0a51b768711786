//! Table selection by name pattern

use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::types::Table;

/// Keep the tables whose name matching `patterns` equals `include`.
///
/// With `include = true` the patterns are an allow-list, with `false` a
/// deny-list. Patterns are regular expressions matched anywhere in the name,
/// with an optional `/` or `\` allowed on either side. Foreign keys of the
/// kept tables are pruned to those whose target passes the same test.
pub fn filter_tables(include: bool, tables: Vec<Table>, patterns: &[String]) -> Result<Vec<Table>> {
    let matcher = TableMatcher::new(patterns)?;
    let before = tables.len();

    let kept: Vec<Table> = tables
        .into_iter()
        .filter(|table| matcher.matches(&table.name) == include)
        .map(|mut table| {
            table
                .foreign_keys
                .retain(|fk| matcher.matches(&fk.target_table) == include);
            table
        })
        .collect();

    tracing::info!(
        mode = if include { "include" } else { "exclude" },
        patterns = ?matcher.patterns(),
        before,
        after = kept.len(),
        "Filtered tables"
    );

    Ok(kept)
}

/// Compiled set of table name patterns
#[derive(Debug)]
pub struct TableMatcher {
    patterns: Vec<String>,
    expressions: Vec<Regex>,
}

impl TableMatcher {
    /// Compile `patterns`, sorted so the result does not depend on their order
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut patterns = patterns.to_vec();
        patterns.sort();

        let expressions = patterns
            .iter()
            .map(|pattern| {
                Regex::new(&format!(r"([\\/])?{}([\\/])?", pattern)).map_err(|source| {
                    Error::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            expressions,
        })
    }

    /// True if any pattern matches `name`
    pub fn matches(&self, name: &str) -> bool {
        self.expressions.iter().any(|re| re.is_match(name))
    }

    /// The sorted source patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
