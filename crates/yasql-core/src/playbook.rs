//! Playbooks and their queries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::PlaybookError;
use crate::value::{Document, Value};

static EMPTY: Document = Document::new();

/// Top-level sections that hold query objects, in declaration order.
pub const QUERY_SECTIONS: &[&str] = &["queries", "tasks"];

/// Keys of a query object that describe the query rather than its body.
const QUERY_META_KEYS: &[&str] = &["name", "doc", "vars", "template", "output"];

/// One named query of a playbook.
///
/// The stored body is never rewritten; rendering always starts again from
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    name: String,
    doc: Option<String>,
    vars: Document,
    template: Option<String>,
    output: Option<Value>,
    body: Document,
}

impl Query {
    /// Build a query from its object in the playbook.
    pub fn from_document(object: &Document) -> Result<Self, PlaybookError> {
        let name = match object.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(PlaybookError::Invalid(format!(
                    "query name must be a string, got {}",
                    other.type_name()
                )));
            }
            None => return Err(PlaybookError::Invalid("query has no name".to_string())),
        };

        let doc = match object.get("doc") {
            None | Some(Value::Null) => None,
            Some(Value::String(doc)) => Some(doc.clone()),
            Some(other) => {
                return Err(PlaybookError::Invalid(format!(
                    "doc of query `{name}` must be a string, got {}",
                    other.type_name()
                )));
            }
        };

        let vars = match object.get("vars") {
            None | Some(Value::Null) => Document::new(),
            Some(Value::Mapping(vars)) => vars.clone(),
            Some(other) => {
                return Err(PlaybookError::Invalid(format!(
                    "vars of query `{name}` must be a mapping, got {}",
                    other.type_name()
                )));
            }
        };

        let template = match object.get("template") {
            None | Some(Value::Null) => None,
            Some(Value::String(path)) => Some(path.clone()),
            Some(other) => {
                return Err(PlaybookError::Invalid(format!(
                    "template of query `{name}` must be a dotted path, got {}",
                    other.type_name()
                )));
            }
        };

        let body = object
            .iter()
            .filter(|(key, _)| !QUERY_META_KEYS.contains(key))
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();

        Ok(Self {
            name,
            doc,
            vars,
            template,
            output: object.get("output").cloned(),
            body,
        })
    }

    /// Query name, unique within its playbook.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation string.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Query-level variables.
    pub const fn vars(&self) -> &Document {
        &self.vars
    }

    /// Dotted path of the template this query extends.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Output specification, passed through untouched for collaborators.
    pub const fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// The body: everything but the descriptive keys (`sql`, `select`, ...).
    pub const fn body(&self) -> &Document {
        &self.body
    }
}

/// A fully loaded playbook.
///
/// Built once after import resolution and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Playbook {
    path: Option<PathBuf>,
    document: Document,
    queries: Vec<Query>,
    index: HashMap<String, usize>,
}

impl Playbook {
    /// Build a playbook from a resolved document.
    ///
    /// Fails if query names are missing or duplicated.
    pub fn from_document(document: Document, path: Option<PathBuf>) -> Result<Self, PlaybookError> {
        for key in ["vars", "templates", "config"] {
            match document.get(key) {
                None | Some(Value::Null | Value::Mapping(_)) => {}
                Some(other) => {
                    return Err(PlaybookError::Invalid(format!(
                        "`{key}` must be a mapping, got {}",
                        other.type_name()
                    )));
                }
            }
        }

        let mut queries = Vec::new();
        for section in QUERY_SECTIONS {
            let items = match document.get(section) {
                None | Some(Value::Null) => continue,
                Some(Value::Sequence(items)) => items,
                Some(other) => {
                    return Err(PlaybookError::Invalid(format!(
                        "`{section}` must be a sequence, got {}",
                        other.type_name()
                    )));
                }
            };
            for (index, item) in items.iter().enumerate() {
                let object = item.as_document().ok_or_else(|| {
                    PlaybookError::Invalid(format!(
                        "`{section}` entry #{index} must be a mapping, got {}",
                        item.type_name()
                    ))
                })?;
                if !object.contains_key("name") {
                    return Err(PlaybookError::MissingName {
                        section: (*section).to_string(),
                        index,
                    });
                }
                queries.push(Query::from_document(object)?);
            }
        }

        let mut index = HashMap::new();
        let mut duplicates = Vec::new();
        for (i, query) in queries.iter().enumerate() {
            if index.insert(query.name.clone(), i).is_some() && !duplicates.contains(&query.name) {
                duplicates.push(query.name.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(PlaybookError::DuplicateName { names: duplicates });
        }

        Ok(Self {
            path,
            document,
            queries,
            index,
        })
    }

    /// File this playbook was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The resolved document.
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Playbook-level variables.
    pub fn vars(&self) -> &Document {
        self.document.get_document("vars").unwrap_or(&EMPTY)
    }

    /// Template fragments, dotted-path addressable.
    pub fn templates(&self) -> &Document {
        self.document.get_document("templates").unwrap_or(&EMPTY)
    }

    /// Collaborator configuration (`timezone`, `dialect`, ...).
    pub fn config(&self) -> &Document {
        self.document.get_document("config").unwrap_or(&EMPTY)
    }

    /// All queries in declaration order.
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Look up a query by name.
    pub fn get_query(&self, name: &str) -> Result<&Query, PlaybookError> {
        self.index
            .get(name)
            .map(|&i| &self.queries[i])
            .ok_or_else(|| PlaybookError::QueryNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(name: &str) -> Value {
        Value::Mapping(
            Document::new()
                .with("name", name)
                .with("doc", "Expected output")
                .with("select", Document::new().with("from", "orders")),
        )
    }

    #[test]
    fn test_queries_and_tasks_are_indexed() {
        let doc = Document::new()
            .with("queries", vec![query("a")])
            .with("tasks", vec![query("b")]);
        let playbook = Playbook::from_document(doc, None).unwrap();
        assert_eq!(playbook.queries().len(), 2);
        assert_eq!(playbook.get_query("b").unwrap().name(), "b");
        assert_eq!(playbook.get_query("a").unwrap().doc(), Some("Expected output"));
    }

    #[test]
    fn test_duplicate_names_across_sections() {
        let doc = Document::new()
            .with("queries", vec![query("a"), query("b")])
            .with("tasks", vec![query("a")]);
        let err = Playbook::from_document(doc, None).unwrap_err();
        assert_eq!(
            err,
            PlaybookError::DuplicateName {
                names: vec!["a".to_string()]
            }
        );
    }

    #[test]
    fn test_unknown_query() {
        let playbook = Playbook::from_document(Document::new(), None).unwrap();
        assert_eq!(
            playbook.get_query("nope").unwrap_err(),
            PlaybookError::QueryNotFound("nope".to_string())
        );
    }

    #[test]
    fn test_missing_name() {
        let nameless = Value::Mapping(Document::new().with("sql", "select 1"));
        let doc = Document::new().with("tasks", vec![nameless]);
        assert!(matches!(
            Playbook::from_document(doc, None),
            Err(PlaybookError::MissingName { index: 0, .. })
        ));
    }

    #[test]
    fn test_body_excludes_meta_keys() {
        let object = Document::new()
            .with("name", "q")
            .with("template", "base.orders")
            .with("vars", Document::new().with("region", "US"))
            .with("select", Document::new().with("limit", 1))
            .with("output", Document::new().with("format", "csv"));
        let q = Query::from_document(&object).unwrap();
        assert_eq!(q.body().keys().collect::<Vec<_>>(), ["select"]);
        assert_eq!(q.template(), Some("base.orders"));
        assert_eq!(q.vars().get_str("region"), Some("US"));
        assert!(q.output().is_some());
    }

    #[test]
    fn test_sections_must_have_the_right_shape() {
        let doc = Document::new().with("vars", vec![Value::from("x")]);
        assert!(matches!(
            Playbook::from_document(doc, None),
            Err(PlaybookError::Invalid(_))
        ));
        let doc = Document::new().with("queries", "nope");
        assert!(matches!(
            Playbook::from_document(doc, None),
            Err(PlaybookError::Invalid(_))
        ));
    }
}
