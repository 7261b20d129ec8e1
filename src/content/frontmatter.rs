//! Front-matter parsing

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_yaml::Value as YamlValue;

use crate::error::ParseError;
use crate::helpers::parse_date_string;

const DELIMITER: &str = "---";

/// Header block of a source document
///
/// System keys (`type`, `createdAt`, `updatedAt`) are lifted out; everything
/// else is kept in declaration order for schema validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub content_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fields: IndexMap<String, YamlValue>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), ParseError> {
        let (header, body) = split(content)?;

        if header.trim().is_empty() {
            return Ok((FrontMatter::default(), body));
        }

        let mapping = match serde_yaml::from_str::<YamlValue>(header) {
            Ok(YamlValue::Mapping(mapping)) => mapping,
            Ok(YamlValue::Null) => return Ok((FrontMatter::default(), body)),
            Ok(_) => {
                return Err(ParseError::MalformedDocument(
                    "front-matter must be a key/value mapping".to_string(),
                ))
            }
            Err(e) => {
                return Err(ParseError::MalformedDocument(format!(
                    "invalid YAML front-matter: {}",
                    e
                )))
            }
        };

        let mut fm = FrontMatter::default();
        for (key, value) in mapping {
            let key = match key {
                YamlValue::String(key) => key,
                other => {
                    return Err(ParseError::MalformedDocument(format!(
                        "front-matter key must be a string, found {}",
                        yaml_kind(&other)
                    )))
                }
            };

            match key.as_str() {
                "type" => fm.content_type = Some(expect_string(&key, value)?),
                "createdAt" => fm.created_at = parse_date_field(&key, value)?,
                "updatedAt" => fm.updated_at = parse_date_field(&key, value)?,
                _ => {
                    fm.fields.insert(key, value);
                }
            }
        }

        Ok((fm, body))
    }
}

/// Split a document into header and body at the `---` delimiters
fn split(content: &str) -> Result<(&str, &str), ParseError> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let rest = content
        .strip_prefix(DELIMITER)
        .filter(|rest| rest.starts_with('\n') || rest.starts_with("\r\n"))
        .ok_or_else(|| {
            ParseError::MalformedDocument("missing opening front-matter delimiter".to_string())
        })?;
    let rest = rest.trim_start_matches(['\n', '\r']);

    // Empty header: the closing delimiter directly follows the opening one
    if let Some(body) = rest
        .strip_prefix(DELIMITER)
        .filter(|body| body.is_empty() || body.starts_with('\n') || body.starts_with("\r\n"))
    {
        return Ok(("", body.trim_start_matches(['\n', '\r'])));
    }

    let mut offset = 0;
    while let Some(pos) = rest[offset..].find("\n---") {
        let start = offset + pos;
        let after = &rest[start + 4..];
        // The delimiter must stand on its own line
        if after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n") {
            let header = rest[..start].trim_end_matches('\r');
            return Ok((header, after.trim_start_matches(['\n', '\r'])));
        }
        offset = start + 4;
    }

    Err(ParseError::MalformedDocument(
        "missing closing front-matter delimiter".to_string(),
    ))
}

fn expect_string(key: &str, value: YamlValue) -> Result<String, ParseError> {
    match value {
        YamlValue::String(s) => Ok(s),
        other => Err(ParseError::PropertyType {
            property: key.to_string(),
            expected: "a string".to_string(),
            found: yaml_kind(&other).to_string(),
        }),
    }
}

fn parse_date_field(key: &str, value: YamlValue) -> Result<Option<DateTime<Utc>>, ParseError> {
    if value.is_null() {
        return Ok(None);
    }
    let raw = expect_string(key, value)?;
    parse_date_string(&raw)
        .map(Some)
        .ok_or_else(|| ParseError::PropertyType {
            property: key.to_string(),
            expected: "a date".to_string(),
            found: format!("{:?}", raw),
        })
}

/// Short description of a YAML value's type for error messages
pub(crate) fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a list",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
type: article
title: Hello World
createdAt: 2024-01-15 10:30:00
projects:
  - rust
  - cms
---

This is the content.
"#;

        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.content_type.as_deref(), Some("article"));
        assert_eq!(
            fm.created_at.unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2024-01-15 10:30"
        );
        let keys: Vec<_> = fm.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["title", "projects"]);
        assert!(remaining.starts_with("This is the content."));
    }

    #[test]
    fn test_missing_delimiter_is_malformed() {
        let err = FrontMatter::parse("# Just markdown\n\nNo header here.").unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument(_)));
    }

    #[test]
    fn test_unclosed_header_is_malformed() {
        let err = FrontMatter::parse("---\ntitle: Open\n\nBody").unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument(_)));
    }

    #[test]
    fn test_empty_header() {
        let (fm, body) = FrontMatter::parse("---\n---\nBody").unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_closing_delimiter_must_stand_alone() {
        assert!(matches!(
            FrontMatter::parse("---\n---trailing\nBody"),
            Err(ParseError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_horizontal_rule_in_body_is_kept() {
        let content = "---\ntitle: Rules\n---\nAbove\n\n---\n\nBelow\n";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.fields.len(), 1);
        assert!(body.contains("Above"));
        assert!(body.contains("---"));
        assert!(body.contains("Below"));
    }

    #[test]
    fn test_bad_date_is_type_error() {
        let err = FrontMatter::parse("---\nupdatedAt: yesterday\n---\n").unwrap_err();
        assert!(matches!(err, ParseError::PropertyType { ref property, .. } if property == "updatedAt"));
    }

    #[test]
    fn test_non_string_type_is_type_error() {
        let err = FrontMatter::parse("---\ntype: [a, b]\n---\n").unwrap_err();
        assert!(matches!(err, ParseError::PropertyType { ref property, .. } if property == "type"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let content = "---\r\ntitle: Windows\r\n---\r\nBody\r\n";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(
            fm.fields.get("title"),
            Some(&YamlValue::String("Windows".to_string()))
        );
        assert!(body.starts_with("Body"));
    }
}
