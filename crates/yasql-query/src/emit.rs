//! SQL emission.
//!
//! Renders a [`SelectQuery`] as a single-line statement without a
//! terminator. Only literals depend on the dialect.

use std::fmt::Write;

use crate::ast::{Condition, Cte, Field, Join, Literal, SelectQuery, Source};
use crate::config::Dialect;

/// Render a query as SQL text.
pub fn to_sql(query: &SelectQuery, dialect: Dialect) -> String {
    Emitter::new(dialect).select(query)
}

/// Render a literal for a dialect.
pub fn literal(value: &Literal, dialect: Dialect) -> String {
    match value {
        Literal::Null => "NULL".to_string(),
        Literal::Boolean(b) => match (dialect, b) {
            (Dialect::Sqlite, true) => "1".to_string(),
            (Dialect::Sqlite, false) => "0".to_string(),
            (_, true) => "TRUE".to_string(),
            (_, false) => "FALSE".to_string(),
        },
        Literal::Integer(n) => n.to_string(),
        Literal::Float(x) if x.is_finite() && x.fract() == 0.0 => format!("{x:.1}"),
        Literal::Float(x) => x.to_string(),
        Literal::String(s) => quote(s, dialect),
    }
}

fn quote(s: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' if dialect == Dialect::Mysql => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Where a condition sits, for parenthesization.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Top,
    And,
    Or,
}

struct Emitter {
    dialect: Dialect,
    anon: usize,
}

impl Emitter {
    const fn new(dialect: Dialect) -> Self {
        Self { dialect, anon: 0 }
    }

    fn select(&mut self, query: &SelectQuery) -> String {
        let mut sql = String::new();

        if !query.ctes.is_empty() {
            let ctes: Vec<_> = query.ctes.iter().map(cte).collect();
            let _ = write!(sql, "WITH {} ", ctes.join(", "));
        }

        sql.push_str("SELECT ");
        if query.fields.is_empty() {
            sql.push('*');
        } else {
            let fields: Vec<_> = query.fields.iter().map(field).collect();
            sql.push_str(&fields.join(", "));
        }

        if let Some(from) = &query.from {
            let from = self.source(from);
            let _ = write!(sql, " FROM {from}");
        }
        for Join { source, on } in &query.joins {
            let source = self.source(source);
            let _ = write!(sql, " JOIN {source} ON {on}");
        }
        if let Some(condition) = &query.where_clause {
            let _ = write!(sql, " WHERE {}", self.condition(condition, Context::Top));
        }
        if !query.group_by.is_empty() {
            let _ = write!(sql, " GROUP BY {}", query.group_by.join(", "));
        }
        if let Some(having) = &query.having {
            let _ = write!(sql, " HAVING {having}");
        }
        if !query.order_by.is_empty() {
            let _ = write!(sql, " ORDER BY {}", query.order_by.join(", "));
        }
        if let Some(limit) = query.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        sql
    }

    fn source(&mut self, source: &Source) -> String {
        match source {
            Source::Table(name) | Source::CteRef(name) => name.clone(),
            Source::Derived(sql) => {
                self.anon += 1;
                format!("({sql}) AS anon_{}", self.anon)
            }
            Source::Aliased { source, alias } => match source.as_ref() {
                Source::Derived(sql) => format!("({sql}) AS {alias}"),
                inner => format!("{} AS {alias}", self.source(inner)),
            },
        }
    }

    fn condition(&self, condition: &Condition, ctx: Context) -> String {
        match condition {
            Condition::Equals { column, value } => {
                format!("{column} = {}", literal(value, self.dialect))
            }
            Condition::IsNull(column) => format!("{column} IS NULL"),
            Condition::InList { values, .. } if values.is_empty() => "1 = 0".to_string(),
            Condition::InList { column, values } => {
                let values: Vec<_> = values.iter().map(|v| literal(v, self.dialect)).collect();
                format!("{column} IN ({})", values.join(", "))
            }
            Condition::DateRange { column, start, end } => match (start, end) {
                (Some(start), Some(end)) => {
                    let range = format!(
                        "{column} >= {} AND {column} < {}",
                        literal(start, self.dialect),
                        literal(end, self.dialect)
                    );
                    if ctx == Context::Or {
                        format!("({range})")
                    } else {
                        range
                    }
                }
                (Some(start), None) => format!("{column} >= {}", literal(start, self.dialect)),
                (None, Some(end)) => format!("{column} < {}", literal(end, self.dialect)),
                (None, None) => "1 = 1".to_string(),
            },
            Condition::And(children) if children.is_empty() => "1 = 1".to_string(),
            Condition::Or(children) if children.is_empty() => "1 = 0".to_string(),
            Condition::And(children) => {
                self.junction(children, " AND ", Context::And, ctx == Context::Or)
            }
            Condition::Or(children) => {
                self.junction(children, " OR ", Context::Or, ctx == Context::And)
            }
            Condition::Raw(fragment) => format!("({fragment})"),
        }
    }

    fn junction(&self, children: &[Condition], sep: &str, inner: Context, wrap: bool) -> String {
        let parts: Vec<_> = children.iter().map(|c| self.condition(c, inner)).collect();
        let joined = parts.join(sep);
        if wrap && parts.len() > 1 {
            format!("({joined})")
        } else {
            joined
        }
    }
}

fn cte(cte: &Cte) -> String {
    format!("{} AS ({})", cte.name, cte.sql)
}

fn field(field: &Field) -> String {
    match &field.alias {
        Some(alias) => format!("{} AS {alias}", field.expr),
        None => field.expr.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(column: &str, value: &str) -> Condition {
        Condition::equals(column, Literal::from(value))
    }

    #[test]
    fn test_select_star() {
        let query = SelectQuery::new().from(Source::Table("orders".to_string()));
        assert_eq!(to_sql(&query, Dialect::Ansi), "SELECT * FROM orders");
    }

    #[test]
    fn test_or_inside_and_is_parenthesized() {
        let query = SelectQuery::new()
            .from(Source::Table("orders".to_string()))
            .where_clause(Condition::And(vec![
                eq("status", "paid"),
                Condition::Or(vec![eq("region", "US"), eq("region", "EU")]),
            ]));
        assert_eq!(
            to_sql(&query, Dialect::Ansi),
            "SELECT * FROM orders WHERE status = 'paid' AND (region = 'US' OR region = 'EU')"
        );
    }

    #[test]
    fn test_and_inside_or_is_parenthesized() {
        let condition = Condition::Or(vec![
            Condition::And(vec![eq("a", "1"), eq("b", "2")]),
            eq("c", "3"),
        ]);
        let query = SelectQuery::new().where_clause(condition);
        assert_eq!(
            to_sql(&query, Dialect::Ansi),
            "SELECT * WHERE (a = '1' AND b = '2') OR c = '3'"
        );
    }

    #[test]
    fn test_empty_junctions() {
        let query = SelectQuery::new().where_clause(Condition::And(vec![
            eq("status", "paid"),
            Condition::Or(vec![]),
        ]));
        assert_eq!(to_sql(&query, Dialect::Ansi), "SELECT * WHERE status = 'paid' AND 1 = 0");

        let query = SelectQuery::new().where_clause(Condition::Or(vec![
            Condition::And(vec![]),
            eq("x", "y"),
        ]));
        assert_eq!(to_sql(&query, Dialect::Ansi), "SELECT * WHERE 1 = 1 OR x = 'y'");
    }

    #[test]
    fn test_raw_fragments_are_parenthesized() {
        let query = SelectQuery::new().where_clause(Condition::And(vec![
            Condition::Raw("a = 1 OR b = 2".to_string()),
            Condition::IsNull("deleted_at".to_string()),
        ]));
        assert_eq!(
            to_sql(&query, Dialect::Ansi),
            "SELECT * WHERE (a = 1 OR b = 2) AND deleted_at IS NULL"
        );
    }

    #[test]
    fn test_date_range_inside_or() {
        let range = Condition::DateRange {
            column: "t".to_string(),
            start: Some(Literal::Integer(1)),
            end: Some(Literal::Integer(2)),
        };
        let query = SelectQuery::new().where_clause(Condition::Or(vec![range, eq("x", "y")]));
        assert_eq!(
            to_sql(&query, Dialect::Ansi),
            "SELECT * WHERE (t >= 1 AND t < 2) OR x = 'y'"
        );
    }

    #[test]
    fn test_derived_sources_get_generated_aliases() {
        let query = SelectQuery::new()
            .from(Source::Derived("select * from a".to_string()))
            .join(Source::Derived("select * from b".to_string()), "anon_1.id = anon_2.id");
        assert_eq!(
            to_sql(&query, Dialect::Ansi),
            "SELECT * FROM (select * from a) AS anon_1 JOIN (select * from b) AS anon_2 ON anon_1.id = anon_2.id"
        );
    }

    #[test]
    fn test_aliased_sources() {
        let query = SelectQuery::new()
            .from(Source::Table("orders".to_string()).aliased("o"))
            .join(Source::Derived("select 1 as id".to_string()).aliased("x"), "x.id = o.id");
        assert_eq!(
            to_sql(&query, Dialect::Ansi),
            "SELECT * FROM orders AS o JOIN (select 1 as id) AS x ON x.id = o.id"
        );
    }

    #[test]
    fn test_full_clause_order() {
        let mut query = SelectQuery::new()
            .from(Source::CteRef("recent".to_string()))
            .limit(10);
        query.ctes.push(Cte {
            name: "recent".to_string(),
            sql: "SELECT * FROM orders".to_string(),
        });
        query.fields = vec![Field::new("region"), Field::with_alias("count(*)", "n")];
        query.group_by = vec!["region".to_string()];
        query.having = Some("count(*) > 1".to_string());
        query.order_by = vec!["n desc".to_string()];
        assert_eq!(
            to_sql(&query, Dialect::Ansi),
            "WITH recent AS (SELECT * FROM orders) SELECT region, count(*) AS n FROM recent \
             GROUP BY region HAVING count(*) > 1 ORDER BY n desc LIMIT 10"
        );
    }

    #[test]
    fn test_in_list() {
        let query = SelectQuery::new().where_clause(Condition::InList {
            column: "id".to_string(),
            values: vec![Literal::Integer(1), Literal::Integer(2)],
        });
        assert_eq!(to_sql(&query, Dialect::Ansi), "SELECT * WHERE id IN (1, 2)");

        let empty = SelectQuery::new().where_clause(Condition::InList {
            column: "id".to_string(),
            values: vec![],
        });
        assert_eq!(to_sql(&empty, Dialect::Ansi), "SELECT * WHERE 1 = 0");
    }

    #[test]
    fn test_literals_by_dialect() {
        assert_eq!(literal(&Literal::from("it's"), Dialect::Ansi), "'it''s'");
        assert_eq!(literal(&Literal::from(r"a\b"), Dialect::Postgres), r"'a\b'");
        assert_eq!(literal(&Literal::from(r"a\b"), Dialect::Mysql), r"'a\\b'");
        assert_eq!(literal(&Literal::Boolean(true), Dialect::Ansi), "TRUE");
        assert_eq!(literal(&Literal::Boolean(false), Dialect::Sqlite), "0");
        assert_eq!(literal(&Literal::Null, Dialect::Mysql), "NULL");
        assert_eq!(literal(&Literal::Float(2.0), Dialect::Ansi), "2.0");
        assert_eq!(literal(&Literal::Float(0.25), Dialect::Ansi), "0.25");
    }
}
