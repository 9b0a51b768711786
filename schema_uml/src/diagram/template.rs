//! Placeholder templates
//!
//! A template is plain text with `{field}` placeholders. `{{` and `}}` stand
//! for literal braces. Templates are parsed once and then rendered against
//! anything that implements [`TemplateContext`].

use once_cell::sync::Lazy;
use regex::Regex;

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("field name pattern is valid"));

/// Supplies values for template placeholders
pub trait TemplateContext {
    /// Value of `name`, or `None` if this context has no such field
    fn field(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`, rejecting unbalanced braces and bad field names
    pub fn parse(source: &str) -> std::result::Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(format!("unclosed placeholder starting at byte {}", pos));
                    }
                    let name = name.trim().to_string();
                    if !FIELD_NAME.is_match(&name) {
                        return Err(format!("invalid placeholder '{{{}}}'", name));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name));
                }
                '}' => return Err(format!("unmatched '}}' at byte {}", pos)),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Parse `source` and check every placeholder against `known` fields
    pub fn parse_with_fields(source: &str, known: &[&str]) -> std::result::Result<Self, String> {
        let template = Self::parse(source)?;
        if let Some(unknown) = template.fields().find(|f| !known.contains(f)) {
            return Err(format!(
                "unknown placeholder '{{{}}}', expected one of: {}",
                unknown,
                known.join(", ")
            ));
        }
        Ok(template)
    }

    /// Placeholder names in order of appearance
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Append the rendered template to `out`
    pub fn render_into(
        &self,
        context: &dyn TemplateContext,
        out: &mut String,
    ) -> std::result::Result<(), String> {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = context
                        .field(name)
                        .ok_or_else(|| format!("no value for placeholder '{{{}}}'", name))?;
                    out.push_str(&value);
                }
            }
        }
        Ok(())
    }

    /// Render the template into a new string
    pub fn render(&self, context: &dyn TemplateContext) -> std::result::Result<String, String> {
        let mut out = String::new();
        self.render_into(context, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    struct Values(HashMap<&'static str, &'static str>);

    impl TemplateContext for Values {
        fn field(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|v| v.to_string())
        }
    }

    fn values() -> Values {
        Values(HashMap::from([("table", "users"), ("column", "email")]))
    }

    #[test]
    fn test_render_placeholders() {
        let template = Template::parse("ix_{table}_{column}").unwrap();
        assert_eq!(template.render(&values()).unwrap(), "ix_users_email");
    }

    #[test]
    fn test_escaped_braces() {
        let template = Template::parse("entity {table} {{\n}}").unwrap();
        assert_eq!(template.render(&values()).unwrap(), "entity users {\n}");
    }

    #[test]
    fn test_fields_in_order() {
        let template = Template::parse("{column} of {table} ({column})").unwrap();
        assert_eq!(template.fields().collect::<Vec<_>>(), vec!["column", "table", "column"]);
    }

    #[test]
    fn test_placeholder_whitespace_is_trimmed() {
        let template = Template::parse("{ table }").unwrap();
        assert_eq!(template.render(&values()).unwrap(), "users");
    }

    #[rstest]
    #[case("entity {table")]
    #[case("entity }")]
    #[case("{}")]
    #[case("{Table}")]
    #[case("{table-name}")]
    fn test_malformed(#[case] source: &str) {
        assert!(Template::parse(source).is_err());
    }

    #[test]
    fn test_unknown_field_rejected_at_parse() {
        let err = Template::parse_with_fields("{table}.{colour}", &["table", "column"]).unwrap_err();
        assert!(err.contains("{colour}"));
    }

    #[test]
    fn test_missing_value_at_render() {
        let template = Template::parse("{table}.{schema}").unwrap();
        let err = template.render(&values()).unwrap_err();
        assert_eq!(err, "no value for placeholder '{schema}'");
    }
}
