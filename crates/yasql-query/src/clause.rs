//! Clause compiler.
//!
//! Turns an expanded `select` mapping into a [`SelectQuery`]. Compilation
//! is pure: the only outside input is the render config, used for date
//! expressions.

use std::sync::LazyLock;

use regex::Regex;
use yasql_core::{Document, Value};

use crate::ast::{Condition, Cte, Field, Join, Literal, SelectQuery, Source};
use crate::config::RenderConfig;
use crate::date::{self, DateContext, DateResult};
use crate::error::RenderError;

/// Keys accepted in a `select` mapping.
pub const SELECT_KEYS: &[&str] = &[
    "fields", "from", "join", "where", "group_by", "order_by", "having", "limit", "with",
];

/// Key of a nested disjunction in `where`.
pub const OR_KEY: &str = "or_";

static JOIN_ON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+on\s+").expect("join pattern is valid"));

static ALIASED_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][\w.]*)\s+(?:(?i:as)\s+)?([A-Za-z_]\w*)$").expect("alias pattern is valid")
});

/// Leading words that make a fragment a subquery rather than an aliased table.
const SUBQUERY_WORDS: &[&str] = &["select", "with", "values", "table"];

/// Compile a `select` mapping.
///
/// `ctes` are the query's CTE definitions; bare names in `from` and `join`
/// that match one of them become CTE references.
pub fn compile(
    select: &Document,
    ctes: Vec<Cte>,
    config: &RenderConfig,
) -> Result<SelectQuery, RenderError> {
    if let Some(key) = select.keys().find(|key| !SELECT_KEYS.contains(key)) {
        return Err(RenderError::invalid(key, "unknown clause"));
    }

    let mut query = SelectQuery::new();
    query.ctes = ctes;

    if let Some(fields) = select.get("fields") {
        query.fields = compile_fields(fields)?;
    }
    if let Some(from) = select.get("from") {
        query.from = Some(compile_from(from, &query)?);
    }
    if let Some(join) = select.get("join") {
        query.joins = compile_joins(join, &query)?;
    }
    if let Some(conditions) = select.get("where") {
        query.where_clause = compile_where(conditions, config)?;
    }
    if let Some(group_by) = select.get("group_by") {
        query.group_by = fragments(group_by, "group_by")?;
    }
    if let Some(order_by) = select.get("order_by") {
        query.order_by = fragments(order_by, "order_by")?;
    }
    match select.get("having") {
        None | Some(Value::Null) => {}
        Some(Value::String(having)) => query.having = Some(having.clone()),
        Some(other) => {
            return Err(RenderError::invalid(
                "having",
                format!("expected a fragment, got {}", other.type_name()),
            ));
        }
    }
    match select.get("limit") {
        None | Some(Value::Null) => {}
        Some(Value::Integer(n)) if *n >= 0 => query.limit = Some(n.unsigned_abs()),
        Some(other) => {
            return Err(RenderError::invalid(
                "limit",
                format!("expected a non-negative integer, got `{other}`"),
            ));
        }
    }

    Ok(query)
}

/// Turn a clause value into a list of entries.
///
/// A string is a one-element list; a mapping becomes one single-key mapping
/// per entry.
pub fn listify(value: &Value, clause: &str) -> Result<Vec<Value>, RenderError> {
    match value {
        Value::Sequence(items) => Ok(items.clone()),
        Value::String(_) => Ok(vec![value.clone()]),
        Value::Mapping(doc) => Ok(doc
            .iter()
            .map(|(key, value)| Value::Mapping(Document::new().with(key, value.clone())))
            .collect()),
        other => Err(RenderError::invalid(
            clause,
            format!("expected a list, got {}", other.type_name()),
        )),
    }
}

/// Split a single-key mapping.
fn single(doc: &Document, clause: &str) -> Result<(String, Value), RenderError> {
    let mut iter = doc.iter();
    match (iter.next(), iter.next()) {
        (Some((key, value)), None) => Ok((key.to_string(), value.clone())),
        _ => Err(RenderError::invalid(
            clause,
            format!("expected a single `alias: value` entry, got {} keys", doc.len()),
        )),
    }
}

fn compile_fields(value: &Value) -> Result<Vec<Field>, RenderError> {
    listify(value, "fields")?
        .iter()
        .map(|item| match item {
            Value::String(expr) => Ok(Field::new(expr.as_str())),
            Value::Mapping(doc) => {
                let (alias, expr) = single(doc, "fields")?;
                if expr.is_scalar() {
                    Ok(Field::with_alias(expr.to_string(), alias))
                } else {
                    Err(RenderError::invalid(
                        "fields",
                        format!("field `{alias}` must be an expression"),
                    ))
                }
            }
            Value::Integer(_) | Value::Float(_) => Ok(Field::new(item.to_string())),
            other => Err(RenderError::invalid(
                "fields",
                format!("expected an expression, got {}", other.type_name()),
            )),
        })
        .collect()
}

/// Resolve a source fragment.
///
/// A bare name is a table, or a CTE reference when the query has a CTE of
/// that name. `name alias` and `name AS alias` alias a table. Any other
/// fragment containing whitespace is an inline subquery.
fn parse_source(text: &str, query: &SelectQuery) -> Source {
    let text = text.trim();
    let named = |name: &str| {
        if query.has_cte(name) {
            Source::CteRef(name.to_string())
        } else {
            Source::Table(name.to_string())
        }
    };

    if !text.contains(char::is_whitespace) {
        return named(text);
    }
    if let Some(caps) = ALIASED_TABLE_RE.captures(text) {
        let name = &caps[1];
        if !SUBQUERY_WORDS.contains(&name.to_ascii_lowercase().as_str()) {
            return named(name).aliased(&caps[2]);
        }
    }
    Source::Derived(text.to_string())
}

fn compile_from(value: &Value, query: &SelectQuery) -> Result<Source, RenderError> {
    match value {
        Value::String(text) => Ok(parse_source(text, query)),
        Value::Mapping(doc) => {
            let (alias, source) = single(doc, "from")?;
            match source {
                Value::String(text) => Ok(parse_source(&text, query).aliased(alias)),
                other => Err(RenderError::invalid(
                    "from",
                    format!("source `{alias}` must be a table or query, got {}", other.type_name()),
                )),
            }
        }
        other => Err(RenderError::invalid(
            "from",
            format!("expected a table or query, got {}", other.type_name()),
        )),
    }
}

/// Split `source on predicate` at the first standalone `on`.
fn split_join<'a>(text: &'a str) -> Result<(&'a str, &'a str), RenderError> {
    JOIN_ON_RE
        .find(text)
        .map(|m| (&text[..m.start()], text[m.end()..].trim()))
        .ok_or_else(|| RenderError::Syntax {
            clause: "join".to_string(),
            message: format!("missing `on` in `{text}`"),
        })
}

fn compile_joins(value: &Value, query: &SelectQuery) -> Result<Vec<Join>, RenderError> {
    listify(value, "join")?
        .iter()
        .map(|item| match item {
            Value::String(text) => {
                let (source, on) = split_join(text)?;
                Ok(Join {
                    source: parse_source(source, query),
                    on: on.to_string(),
                })
            }
            Value::Mapping(doc) => {
                let (alias, text) = single(doc, "join")?;
                let Value::String(text) = text else {
                    return Err(RenderError::invalid(
                        "join",
                        format!("join `{alias}` must be `source on predicate`"),
                    ));
                };
                let (source, on) = split_join(&text)?;
                Ok(Join {
                    source: parse_source(source, query).aliased(alias),
                    on: on.to_string(),
                })
            }
            other => Err(RenderError::invalid(
                "join",
                format!("expected `source on predicate`, got {}", other.type_name()),
            )),
        })
        .collect()
}

fn compile_where(value: &Value, config: &RenderConfig) -> Result<Option<Condition>, RenderError> {
    let mut conditions = listify(value, "where")?
        .iter()
        .map(|item| condition(item, config))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(Condition::And(conditions)),
    })
}

/// Build one condition: a raw fragment or a `{column: value}` mapping.
fn condition(item: &Value, config: &RenderConfig) -> Result<Condition, RenderError> {
    match item {
        Value::String(fragment) => Ok(Condition::Raw(fragment.clone())),
        Value::Mapping(doc) if doc.len() == 1 => {
            let (column, value) = single(doc, "where")?;
            comparison(&column, &value, config)
        }
        Value::Mapping(doc) if !doc.is_empty() => doc
            .iter()
            .map(|(column, value)| comparison(column, value, config))
            .collect::<Result<_, _>>()
            .map(Condition::And),
        other => Err(RenderError::invalid(
            "where",
            format!("expected a condition, got `{other}`"),
        )),
    }
}

fn comparison(column: &str, value: &Value, config: &RenderConfig) -> Result<Condition, RenderError> {
    if column == OR_KEY {
        return listify(value, OR_KEY)?
            .iter()
            .map(|item| condition(item, config))
            .collect::<Result<_, _>>()
            .map(Condition::Or);
    }

    match value {
        Value::Null => Ok(Condition::IsNull(column.to_string())),
        Value::Sequence(items) => Ok(Condition::InList {
            column: column.to_string(),
            values: items
                .iter()
                .map(|item| to_literal(item, column))
                .collect::<Result<_, _>>()?,
        }),
        Value::String(text) if date::is_date_expr(text) => {
            let ctx = DateContext::from_config(config);
            Ok(match date::resolve(text, &ctx)? {
                DateResult::Instant(value) => Condition::equals(column, value),
                DateResult::Interval { start, end } => Condition::DateRange {
                    column: column.to_string(),
                    start,
                    end,
                },
            })
        }
        other => Ok(Condition::equals(column, to_literal(other, column)?)),
    }
}

fn to_literal(value: &Value, column: &str) -> Result<Literal, RenderError> {
    match value {
        Value::Null => Ok(Literal::Null),
        Value::Bool(b) => Ok(Literal::Boolean(*b)),
        Value::Integer(n) => Ok(Literal::Integer(*n)),
        Value::Float(x) if x.is_finite() => Ok(Literal::Float(*x)),
        Value::Float(x) => Err(RenderError::invalid(
            "where",
            format!("value for `{column}` must be a finite number, got {x}"),
        )),
        Value::String(s) => Ok(Literal::String(s.clone())),
        other => Err(RenderError::invalid(
            "where",
            format!("value for `{column}` must be a scalar, got {}", other.type_name()),
        )),
    }
}

/// GROUP BY / ORDER BY entries.
fn fragments(value: &Value, clause: &str) -> Result<Vec<String>, RenderError> {
    listify(value, clause)?
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(_) => Ok(item.to_string()),
            other => Err(RenderError::invalid(
                clause,
                format!("expected a column or fragment, got {}", other.type_name()),
            )),
        })
        .collect()
}
