//! `imports` entries.

use yasql_core::{Document, Value};

/// One entry of a playbook's `imports` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Path of the source playbook, relative to the importing one.
    pub from: String,
    /// Dotted keys to copy out of the source playbook.
    pub keys: Vec<String>,
    /// Namespace the imported keys are nested under.
    pub alias: Option<String>,
}

impl ImportSpec {
    /// Parse the value of an `imports` key.
    ///
    /// A single mapping is accepted in place of a one-element sequence.
    pub fn parse_list(value: &Value) -> Result<Vec<Self>, String> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Mapping(entry) => Ok(vec![Self::parse(entry)?]),
            Value::Sequence(items) => items
                .iter()
                .map(|item| {
                    item.as_document()
                        .ok_or_else(|| format!("import entry must be a mapping, got {}", item.type_name()))
                        .and_then(Self::parse)
                })
                .collect(),
            other => Err(format!("`imports` must be a sequence, got {}", other.type_name())),
        }
    }

    fn parse(entry: &Document) -> Result<Self, String> {
        let from = match entry.get("from") {
            Some(Value::String(from)) if !from.is_empty() => from.clone(),
            Some(other) => {
                return Err(format!("`from` must be a path, got {}", other.type_name()));
            }
            None => return Err("import entry has no `from`".to_string()),
        };

        let keys = match entry.get("import") {
            Some(Value::String(key)) => vec![key.clone()],
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| format!("import key must be a string, got {}", item.type_name()))
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(format!(
                    "`import` must be a key or a list of keys, got {}",
                    other.type_name()
                ));
            }
            None => return Err(format!("import from `{from}` names no keys")),
        };
        if let Some(bad) = keys.iter().find(|key| key.split('.').any(str::is_empty)) {
            return Err(format!("invalid import key `{bad}`"));
        }

        let alias = match entry.get("as") {
            None | Some(Value::Null) => None,
            Some(Value::String(alias)) if !alias.is_empty() => Some(alias.clone()),
            Some(other) => {
                return Err(format!("`as` must be a name, got {}", other.type_name()));
            }
        };

        Ok(Self { from, keys, alias })
    }

    /// The document layer that places `value` where `key` was found,
    /// under the namespace if there is one.
    pub fn layer(&self, key: &str, value: Value) -> Document {
        let mut segments = key.rsplit('.');
        let leaf = segments.next().unwrap_or(key);
        let mut layer = Document::new().with(leaf, value);
        for segment in segments {
            layer = Document::new().with(segment, layer);
        }
        match &self.alias {
            Some(alias) => Document::new().with(alias.as_str(), layer),
            None => layer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pairs: &[(&str, Value)]) -> Value {
        Value::Mapping(pairs.iter().cloned().collect())
    }

    #[test]
    fn test_single_and_multiple_keys() {
        let list = Value::Sequence(vec![
            entry(&[("from", "a.yaml".into()), ("import", "vars".into())]),
            entry(&[
                ("from", "b.yaml".into()),
                ("import", vec![Value::from("templates"), Value::from("queries")].into()),
                ("as", "b".into()),
            ]),
        ]);
        let specs = ImportSpec::parse_list(&list).unwrap();
        assert_eq!(specs[0].keys, ["vars"]);
        assert_eq!(specs[0].alias, None);
        assert_eq!(specs[1].keys, ["templates", "queries"]);
        assert_eq!(specs[1].alias.as_deref(), Some("b"));
    }

    #[test]
    fn test_rejects_missing_fields() {
        let no_from = entry(&[("import", "vars".into())]);
        assert!(ImportSpec::parse_list(&no_from).is_err());
        let no_keys = entry(&[("from", "a.yaml".into())]);
        assert!(ImportSpec::parse_list(&no_keys).is_err());
        let bad_key = entry(&[("from", "a.yaml".into()), ("import", "vars..x".into())]);
        assert!(ImportSpec::parse_list(&bad_key).is_err());
        assert!(ImportSpec::parse_list(&Value::from(3)).is_err());
    }

    #[test]
    fn test_layer_nests_dotted_key() {
        let spec = ImportSpec {
            from: "a.yaml".to_string(),
            keys: vec![],
            alias: None,
        };
        let layer = spec.layer("templates.orders", Value::from("x"));
        assert_eq!(layer.get_path("templates.orders").unwrap(), &Value::from("x"));
    }

    #[test]
    fn test_layer_under_namespace() {
        let spec = ImportSpec {
            from: "a.yaml".to_string(),
            keys: vec![],
            alias: Some("shared".to_string()),
        };
        let layer = spec.layer("vars", Value::Mapping(Document::new().with("region", "US")));
        assert_eq!(layer.get_path("shared.vars.region").unwrap(), &Value::from("US"));
    }
}
