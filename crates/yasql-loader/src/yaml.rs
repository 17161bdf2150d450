//! YAML text to [`Document`] conversion.

use serde_yaml::Value as Yaml;
use thiserror::Error;
use yasql_core::{Document, Value};

/// Problems converting parsed YAML into a document.
#[derive(Debug, Error)]
pub enum YamlError {
    /// The text is not valid YAML.
    #[error("invalid YAML: {0}")]
    Syntax(#[source] serde_yaml::Error),
    /// The YAML is valid but cannot be represented as a playbook document.
    #[error("{0}")]
    Shape(String),
}

/// Parse YAML text into a document.
///
/// An empty file is an empty document. Anything other than a mapping at
/// the top level is rejected. `<<` merge keys are applied, with explicit
/// keys taking priority over merged ones.
pub fn parse_document(text: &str) -> Result<Document, YamlError> {
    let yaml: Yaml = serde_yaml::from_str(text).map_err(YamlError::Syntax)?;
    match convert(yaml)? {
        Value::Null => Ok(Document::new()),
        Value::Mapping(doc) => Ok(doc),
        other => Err(YamlError::Shape(format!(
            "top level must be a mapping, got {}",
            other.type_name()
        ))),
    }
}

fn convert(yaml: Yaml) -> Result<Value, YamlError> {
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(x) = n.as_f64() {
                Value::Float(x)
            } else {
                return Err(YamlError::Shape(format!("unsupported number {n}")));
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => {
            Value::Sequence(items.into_iter().map(convert).collect::<Result<_, _>>()?)
        }
        Yaml::Mapping(mapping) => Value::Mapping(convert_mapping(mapping)?),
        Yaml::Tagged(tagged) => convert(tagged.value)?,
    })
}

fn convert_mapping(mapping: serde_yaml::Mapping) -> Result<Document, YamlError> {
    let mut merged = Vec::new();
    let mut explicit = Vec::new();

    for (key, value) in mapping {
        if matches!(&key, Yaml::String(k) if k == "<<") {
            match convert(value)? {
                Value::Mapping(doc) => merged.push(doc),
                Value::Sequence(items) => {
                    for item in items {
                        match item {
                            Value::Mapping(doc) => merged.push(doc),
                            other => {
                                return Err(YamlError::Shape(format!(
                                    "`<<` expects mappings, got {}",
                                    other.type_name()
                                )));
                            }
                        }
                    }
                }
                other => {
                    return Err(YamlError::Shape(format!(
                        "`<<` expects a mapping, got {}",
                        other.type_name()
                    )));
                }
            }
            continue;
        }
        explicit.push((key_string(key)?, convert(value)?));
    }

    // Earlier merge sources win among themselves; explicit keys win over all.
    let mut doc = Document::new();
    for source in merged {
        for (key, value) in source {
            if !doc.contains_key(&key) {
                doc.insert(key, value);
            }
        }
    }
    for (key, value) in explicit {
        doc.insert(key, value);
    }
    Ok(doc)
}

fn key_string(key: Yaml) -> Result<String, YamlError> {
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(YamlError::Shape(format!(
            "mapping keys must be scalars, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_error_messages() {
        let err = parse_document("- a\n- b\n").unwrap_err();
        assert_eq!(err.to_string(), "top level must be a mapping, got sequence");
        assert!(err.source().is_none());

        let err = parse_document("key: [unclosed\n").unwrap_err();
        assert!(matches!(err, YamlError::Syntax(_)));
        assert!(err.to_string().starts_with("invalid YAML: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_scalars_and_order() {
        let doc = parse_document(
            "name: orders\nlimit: 10\nratio: 0.5\nactive: true\nnothing: ~\nfields: [id, total]\n",
        )
        .unwrap();
        assert_eq!(
            doc.keys().collect::<Vec<_>>(),
            ["name", "limit", "ratio", "active", "nothing", "fields"]
        );
        assert_eq!(doc.get("limit"), Some(&Value::Integer(10)));
        assert_eq!(doc.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(doc.get("active"), Some(&Value::Bool(true)));
        assert_eq!(doc.get("nothing"), Some(&Value::Null));
    }

    #[test]
    fn test_empty_text_is_empty_document() {
        assert!(parse_document("").unwrap().is_empty());
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        assert!(matches!(parse_document("- a\n- b\n"), Err(YamlError::Shape(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse_document("not: [valid: yaml"),
            Err(YamlError::Syntax(_))
        ));
    }

    #[test]
    fn test_merge_keys() {
        let text = "
base: &base
  from: orders
  limit: 10
query:
  <<: *base
  limit: 5
";
        let doc = parse_document(text).unwrap();
        let query = doc.get_document("query").unwrap();
        assert_eq!(query.get_str("from"), Some("orders"));
        assert_eq!(query.get("limit"), Some(&Value::Integer(5)));
        assert_eq!(query.keys().collect::<Vec<_>>(), ["from", "limit"]);
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let doc = parse_document("2020: year\ntrue: yes\n").unwrap();
        assert_eq!(doc.get_str("2020"), Some("year"));
        assert_eq!(doc.get_str("true"), Some("yes"));
    }
}
