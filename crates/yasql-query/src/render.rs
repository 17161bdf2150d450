//! The render loop.
//!
//! A query body is driven through a fixed series of shapes, one pass at a
//! time:
//!
//! ```text
//! Spec -> Templated -> Expanded -> Substituted -> Compiled -> Done
//!                   \-> RawSql ---------------------------/
//! ```
//!
//! Every pass spends one unit of the config's pass budget. Each query body
//! has a budget of its own, so a CTE-referenced query renders with a fresh
//! one. The chain of queries being rendered is tracked separately, and a
//! reference back into it fails with [`RenderError::CyclicCte`].

use yasql_core::{Document, Playbook, Query, Value};

use crate::ast::{Cte, SelectQuery};
use crate::clause;
use crate::config::{Dialect, RenderConfig};
use crate::emit;
use crate::error::RenderError;
use crate::expand::{self, CteSource};

/// Shape of a query body between passes.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// The stored body.
    Spec(Document),
    /// Body with its template merged in.
    Templated(Document),
    /// A raw `sql` body awaiting variables.
    RawSql(Value),
    /// A select body with its CTE references resolved.
    Expanded {
        /// CTE definitions in declaration order.
        ctes: Vec<(String, CteSource)>,
        /// The select mapping without `with`.
        select: Document,
    },
    /// A select body with variables substituted.
    Substituted {
        /// Final CTE definitions.
        ctes: Vec<Cte>,
        /// The select mapping.
        select: Document,
    },
    /// The compiled AST.
    Compiled(SelectQuery),
    /// Final SQL text, without terminator.
    Done(String),
}

/// A query compiled as far as it goes before emission.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledQuery {
    /// A select body.
    Select(SelectQuery),
    /// A raw `sql` body, variables substituted.
    Raw(String),
}

impl CompiledQuery {
    /// CTEs attached to the query.
    pub fn ctes(&self) -> &[Cte] {
        match self {
            Self::Select(query) => &query.ctes,
            Self::Raw(_) => &[],
        }
    }

    /// Emit terminated SQL.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            Self::Select(query) => terminate(&emit::to_sql(query, dialect)),
            Self::Raw(sql) => terminate(sql),
        }
    }
}

/// Trim a statement and terminate it with exactly one `;`.
pub fn terminate(sql: &str) -> String {
    format!("{};", expand::strip_terminator(sql))
}

/// Renders the queries of one playbook.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    playbook: &'a Playbook,
    config: &'a RenderConfig,
}

impl<'a> Renderer<'a> {
    /// Create a renderer.
    pub const fn new(playbook: &'a Playbook, config: &'a RenderConfig) -> Self {
        Self { playbook, config }
    }

    /// Render a query by name to terminated SQL.
    pub fn render(&self, name: &str) -> Result<String, RenderError> {
        self.render_query(self.lookup(name)?)
    }

    /// Render a query to terminated SQL.
    pub fn render_query(&self, query: &Query) -> Result<String, RenderError> {
        let mut chain = vec![query.name().to_string()];
        self.render_with(query, &mut chain)
    }

    /// Compile a query by name without emitting it.
    pub fn compile(&self, name: &str) -> Result<CompiledQuery, RenderError> {
        let query = self.lookup(name)?;
        let mut chain = vec![query.name().to_string()];
        let mut budget = self.config.max_passes;
        let mut stage = Stage::Spec(query.body().clone());
        loop {
            stage = match stage {
                Stage::Compiled(select) => return Ok(CompiledQuery::Select(select)),
                Stage::Done(sql) => return Ok(CompiledQuery::Raw(sql)),
                other => self.advance(query, other, &mut budget, &mut chain)?,
            };
        }
    }

    fn lookup(&self, name: &str) -> Result<&'a Query, RenderError> {
        self.playbook
            .get_query(name)
            .map_err(|_| RenderError::NotFound(name.to_string()))
    }

    /// Render `query`, whose name is the last entry of `chain`.
    fn render_with(&self, query: &Query, chain: &mut Vec<String>) -> Result<String, RenderError> {
        let mut budget = self.config.max_passes;
        let mut stage = Stage::Spec(query.body().clone());
        loop {
            stage = match stage {
                Stage::Done(sql) => return Ok(terminate(&sql)),
                other => self.advance(query, other, &mut budget, chain)?,
            };
        }
    }

    /// Render the query a CTE refers to.
    fn render_referenced(&self, name: &str, chain: &mut Vec<String>) -> Result<String, RenderError> {
        if chain.iter().any(|entry| entry == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(RenderError::CyclicCte(cycle));
        }
        let referenced = self.lookup(name)?;
        chain.push(name.to_string());
        let sql = self.render_with(referenced, chain);
        chain.pop();
        sql
    }

    /// Spend one pass and take one step.
    fn advance(
        &self,
        query: &Query,
        stage: Stage,
        budget: &mut usize,
        chain: &mut Vec<String>,
    ) -> Result<Stage, RenderError> {
        if *budget == 0 {
            return Err(RenderError::NonConvergence {
                passes: self.config.max_passes,
                state: format!("{stage:?}"),
            });
        }
        *budget -= 1;
        self.step(query, stage, chain)
    }

    fn step(&self, query: &Query, stage: Stage, chain: &mut Vec<String>) -> Result<Stage, RenderError> {
        Ok(match stage {
            Stage::Spec(body) => {
                Stage::Templated(expand::apply_template(&body, query.template(), self.playbook)?)
            }
            Stage::Templated(body) => match (body.get("sql"), body.get("select")) {
                (Some(sql), None) => Stage::RawSql(sql.clone()),
                (None, Some(Value::Mapping(select))) => {
                    let mut select = select.clone();
                    let ctes = expand::resolve_ctes(&mut select, |name| {
                        self.render_referenced(name, chain)
                    })?;
                    Stage::Expanded { ctes, select }
                }
                (None, Some(other)) => {
                    return Err(RenderError::invalid(
                        "select",
                        format!("expected a mapping, got {}", other.type_name()),
                    ));
                }
                (Some(_), Some(_)) => {
                    return Err(RenderError::invalid(
                        "body",
                        format!("query `{}` has both `sql` and `select`", query.name()),
                    ));
                }
                (None, None) => {
                    return Err(RenderError::invalid(
                        "body",
                        format!("query `{}` has neither `sql` nor `select`", query.name()),
                    ));
                }
            },
            Stage::RawSql(sql) => {
                let vars = expand::combined_vars(self.playbook, query);
                match expand::substitute(&sql, &vars)? {
                    Value::String(sql) => Stage::Done(sql),
                    other => {
                        return Err(RenderError::invalid(
                            "sql",
                            format!("expected SQL text, got {}", other.type_name()),
                        ));
                    }
                }
            }
            Stage::Expanded { ctes, select } => {
                let vars = expand::combined_vars(self.playbook, query);
                Stage::Substituted {
                    ctes: expand::substitute_ctes(ctes, &vars)?,
                    select: expand::substitute_document(&select, &vars)?,
                }
            }
            Stage::Substituted { ctes, select } => {
                Stage::Compiled(clause::compile(&select, ctes, self.config)?)
            }
            Stage::Compiled(select) => Stage::Done(emit::to_sql(&select, self.config.dialect)),
            done @ Stage::Done(_) => done,
        })
    }
}

/// Rendering entry point on [`Query`].
pub trait RenderQuery {
    /// Render to terminated SQL.
    fn render(&self, playbook: &Playbook, config: &RenderConfig) -> Result<String, RenderError>;
}

impl RenderQuery for Query {
    fn render(&self, playbook: &Playbook, config: &RenderConfig) -> Result<String, RenderError> {
        Renderer::new(playbook, config).render_query(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(name: &str, body: Document) -> Value {
        Value::Mapping(
            body.iter()
                .fold(Document::new().with("name", name), |doc, (k, v)| doc.with(k, v.clone())),
        )
    }

    fn playbook(queries: Vec<Value>) -> Playbook {
        Playbook::from_document(Document::new().with("queries", queries), None).unwrap()
    }

    #[test]
    fn test_raw_sql_is_terminated_once() {
        let pb = playbook(vec![query("q", Document::new().with("sql", "  select 1 ;; "))]);
        let config = RenderConfig::new();
        assert_eq!(Renderer::new(&pb, &config).render("q").unwrap(), "select 1;");
    }

    #[test]
    fn test_unknown_query() {
        let pb = playbook(vec![]);
        let config = RenderConfig::new();
        assert!(matches!(
            Renderer::new(&pb, &config).render("nope"),
            Err(RenderError::NotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_select_pass_count() {
        // Spec, Templated, Expanded, Substituted, Compiled: five passes.
        let select = Document::new().with("select", Document::new().with("from", "orders"));
        let pb = playbook(vec![query("q", select)]);
        let enough = RenderConfig::new().with_max_passes(5);
        assert_eq!(
            Renderer::new(&pb, &enough).render("q").unwrap(),
            "SELECT * FROM orders;"
        );
        let short = RenderConfig::new().with_max_passes(4);
        assert!(matches!(
            Renderer::new(&pb, &short).render("q"),
            Err(RenderError::NonConvergence { passes: 4, .. })
        ));
    }

    #[test]
    fn test_non_convergence_carries_last_state() {
        let pb = playbook(vec![query("q", Document::new().with("sql", "select 1"))]);
        let config = RenderConfig::new().with_max_passes(2);
        match Renderer::new(&pb, &config).render("q") {
            Err(RenderError::NonConvergence { state, .. }) => assert!(state.starts_with("RawSql")),
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }

    fn select_with(from: &str, with: Vec<Value>) -> Document {
        Document::new().with("select", Document::new().with("from", from).with("with", with))
    }

    #[test]
    fn test_cyclic_cte_references_fail_fast() {
        let pb = playbook(vec![
            query("a", select_with("b", vec![Value::from("b")])),
            query("b", select_with("a", vec![Value::from("a")])),
            query("me", select_with("me", vec![Value::from("me")])),
        ]);
        let config = RenderConfig::new();
        let renderer = Renderer::new(&pb, &config);
        match renderer.render("a") {
            Err(RenderError::CyclicCte(cycle)) => assert_eq!(cycle, ["a", "b", "a"]),
            other => panic!("expected CyclicCte, got {other:?}"),
        }
        match renderer.compile("me") {
            Err(RenderError::CyclicCte(cycle)) => assert_eq!(cycle, ["me", "me"]),
            other => panic!("expected CyclicCte, got {other:?}"),
        }
    }

    #[test]
    fn test_each_referenced_query_gets_its_own_budget() {
        // Five passes is exactly one plain select; the references render
        // with budgets of their own.
        let base = Document::new().with("select", Document::new().with("from", "orders"));
        let siblings = (0..3)
            .map(|i| Value::Mapping(Document::new().with(format!("c{i}"), "base")))
            .collect();
        let pb = playbook(vec![query("base", base), query("outer", select_with("c0", siblings))]);
        let config = RenderConfig::new().with_max_passes(5);
        let sql = Renderer::new(&pb, &config).render("outer").unwrap();
        assert!(sql.starts_with("WITH c0 AS (SELECT * FROM orders), c1 AS"));
    }

    #[test]
    fn test_shared_reference_is_not_a_cycle() {
        // a -> b -> base and a -> base: base is reached twice, never from itself.
        let base = Document::new().with("select", Document::new().with("from", "orders"));
        let pb = playbook(vec![
            query("base", base),
            query("b", select_with("base", vec![Value::from("base")])),
            query("a", select_with("b", vec![Value::from("base"), Value::from("b")])),
        ]);
        let config = RenderConfig::new();
        assert!(Renderer::new(&pb, &config).render("a").is_ok());
    }

    #[test]
    fn test_body_shape_errors() {
        let pb = playbook(vec![
            query("both", Document::new().with("sql", "select 1").with("select", Document::new())),
            query("neither", Document::new()),
            query("scalar", Document::new().with("select", "orders")),
        ]);
        let config = RenderConfig::new();
        let renderer = Renderer::new(&pb, &config);
        for name in ["both", "neither", "scalar"] {
            assert!(matches!(
                renderer.render(name),
                Err(RenderError::InvalidClause { .. })
            ));
        }
    }

    #[test]
    fn test_compile_exposes_ctes() {
        let inner = Document::new().with("sql", "select * from orders where paid");
        let outer = Document::new().with(
            "select",
            Document::new()
                .with("from", "paid")
                .with("with", vec![Value::Mapping(Document::new().with("paid", "inner"))]),
        );
        let pb = playbook(vec![query("inner", inner), query("outer", outer)]);
        let config = RenderConfig::new();
        let compiled = Renderer::new(&pb, &config).compile("outer").unwrap();
        assert_eq!(
            compiled.ctes(),
            [Cte {
                name: "paid".to_string(),
                sql: "select * from orders where paid".to_string(),
            }]
        );
        assert_eq!(
            compiled.to_sql(Dialect::Ansi),
            "WITH paid AS (select * from orders where paid) SELECT * FROM paid;"
        );
        assert!(matches!(
            Renderer::new(&pb, &config).compile("inner").unwrap(),
            CompiledQuery::Raw(_)
        ));
    }

    #[test]
    fn test_render_query_trait() {
        let pb = playbook(vec![query("q", Document::new().with("sql", "select ${n}"))]);
        let pb_vars = Playbook::from_document(
            pb.document().clone().with("vars", Document::new().with("n", 42)),
            None,
        )
        .unwrap();
        let config = RenderConfig::new();
        let q = pb_vars.get_query("q").unwrap();
        assert_eq!(q.render(&pb_vars, &config).unwrap(), "select 42;");
    }
}
