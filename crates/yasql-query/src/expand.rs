//! Macro expansion: templates, CTE references and variables.
//!
//! Each pass is a plain function over documents so the render loop can
//! chain them one step at a time.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use yasql_core::{merge, normalize, Document, Playbook, Query, Value};

use crate::ast::Cte;
use crate::clause::listify;
use crate::error::RenderError;

/// `${name}` and `$${name}` references.
static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?)\$\{\s*([A-Za-z_]\w*(?:\.\w+)*)\s*\}").expect("variable pattern is valid")
});

/// A CTE definition before variable substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CteSource {
    /// SQL of a rendered query, final.
    Rendered(String),
    /// Inline SQL text, still subject to variable substitution.
    Inline(String),
}

/// Merge a template under a query body.
///
/// The template path is looked up in the playbook's `templates` first and
/// then in the whole document, so imported namespaces can be addressed too.
/// Without a template the body's merge markers are resolved against
/// nothing.
pub fn apply_template(
    body: &Document,
    template: Option<&str>,
    playbook: &Playbook,
) -> Result<Document, RenderError> {
    let Some(path) = template else {
        return Ok(normalize(body));
    };

    let fragment = playbook
        .templates()
        .get_path(path)
        .or_else(|_| playbook.document().get_path(path))
        .map_err(|_| RenderError::TemplateNotFound(path.to_string()))?;
    let Value::Mapping(template) = fragment else {
        return Err(RenderError::invalid(
            "template",
            format!("`{path}` must be a mapping, got {}", fragment.type_name()),
        ));
    };

    Ok(merge(&[template.clone(), body.clone()]))
}

/// Take `with` out of a select mapping and resolve each entry.
///
/// Entries are bare query names, `{alias: query}` or `{alias: inline sql}`.
/// `render` is called with the name of every referenced query and must
/// return its SQL.
pub fn resolve_ctes(
    select: &mut Document,
    mut render: impl FnMut(&str) -> Result<String, RenderError>,
) -> Result<Vec<(String, CteSource)>, RenderError> {
    let Some(with) = select.remove("with") else {
        return Ok(Vec::new());
    };

    let mut ctes: Vec<(String, CteSource)> = Vec::new();
    for item in listify(&with, "with")? {
        let (alias, target) = match &item {
            Value::String(name) => (name.clone(), name.clone()),
            Value::Mapping(doc) if doc.len() == 1 => match doc.iter().next() {
                Some((alias, Value::String(target))) => (alias.to_string(), target.clone()),
                _ => {
                    return Err(RenderError::invalid(
                        "with",
                        format!("`{item}` must map an alias to a query or SQL"),
                    ));
                }
            },
            other => {
                return Err(RenderError::invalid(
                    "with",
                    format!("expected a query name or `alias: query`, got `{other}`"),
                ));
            }
        };

        if ctes.iter().any(|(name, _)| *name == alias) {
            return Err(RenderError::DuplicateCte(alias));
        }
        let source = if target.contains(char::is_whitespace) {
            CteSource::Inline(target)
        } else {
            CteSource::Rendered(strip_terminator(&render(&target)?).to_string())
        };
        ctes.push((alias, source));
    }
    Ok(ctes)
}

/// Playbook variables overlaid with the query's own.
pub fn combined_vars(playbook: &Playbook, query: &Query) -> Document {
    merge(&[playbook.vars().clone(), query.vars().clone()])
}

/// Substitute variables in every string of a value.
pub fn substitute(value: &Value, vars: &Document) -> Result<Value, RenderError> {
    match value {
        Value::String(text) => substitute_str(text, vars),
        Value::Sequence(items) => items
            .iter()
            .map(|item| substitute(item, vars))
            .collect::<Result<_, _>>()
            .map(Value::Sequence),
        Value::Mapping(doc) => substitute_document(doc, vars).map(Value::Mapping),
        other => Ok(other.clone()),
    }
}

/// Substitute variables in every value of a document.
pub fn substitute_document(doc: &Document, vars: &Document) -> Result<Document, RenderError> {
    doc.iter()
        .map(|(key, value)| Ok((key, substitute(value, vars)?)))
        .collect()
}

/// Substitute variables in a string.
///
/// A string that is exactly one reference takes the variable's value and
/// type. Otherwise every reference is replaced by its scalar value.
pub fn substitute_str(text: &str, vars: &Document) -> Result<Value, RenderError> {
    if let Some(caps) = VAR_RE.captures(text) {
        let whole = caps.get(0).is_some_and(|m| m.len() == text.len());
        if whole && caps[1].is_empty() {
            return lookup(&caps[2], vars).cloned();
        }
    } else {
        return Ok(Value::String(text.to_string()));
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in VAR_RE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&text[last..m.start()]);
        out.push_str(&replacement(&caps, vars)?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(Value::String(out))
}

fn replacement(caps: &Captures<'_>, vars: &Document) -> Result<String, RenderError> {
    // `$${name}` is an escaped literal `${name}`.
    if !caps[1].is_empty() {
        return Ok(caps[0][1..].to_string());
    }
    let name = &caps[2];
    let value = lookup(name, vars)?;
    if value.is_scalar() {
        Ok(value.to_string())
    } else {
        Err(RenderError::VariableNotScalar {
            name: name.to_string(),
            type_name: value.type_name(),
        })
    }
}

fn lookup<'a>(name: &str, vars: &'a Document) -> Result<&'a Value, RenderError> {
    vars.get_path(name)
        .map_err(|_| RenderError::UndefinedVariable(name.to_string()))
}

/// Trim a statement and drop its trailing terminators.
pub fn strip_terminator(sql: &str) -> &str {
    let mut sql = sql.trim();
    while let Some(rest) = sql.strip_suffix(';') {
        sql = rest.trim_end();
    }
    sql
}

/// Substitute the inline CTEs; rendered ones are final already.
pub fn substitute_ctes(ctes: Vec<(String, CteSource)>, vars: &Document) -> Result<Vec<Cte>, RenderError> {
    ctes.into_iter()
        .map(|(name, source)| {
            let sql = match source {
                CteSource::Rendered(sql) => sql,
                CteSource::Inline(text) => match substitute_str(&text, vars)? {
                    Value::String(sql) => sql,
                    other => {
                        return Err(RenderError::invalid(
                            "with",
                            format!("CTE `{name}` must be SQL text, got {}", other.type_name()),
                        ));
                    }
                },
            };
            Ok(Cte { name, sql })
        })
        .collect()
}
