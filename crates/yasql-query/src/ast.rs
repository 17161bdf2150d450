//! Query AST types.
//!
//! This module defines the compiled form of a select body: a single
//! `SELECT` statement with its CTEs, sources and conditions. Nothing in
//! here knows about YAML; the clause compiler builds these and the
//! emitter renders them.

/// A literal value in a compiled query.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// NULL literal.
    Null,
    /// Boolean literal.
    Boolean(bool),
    /// Integer literal.
    Integer(i64),
    /// Floating point literal.
    Float(f64),
    /// String literal.
    String(String),
}

/// A compiled SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Named subqueries, in declaration order.
    pub ctes: Vec<Cte>,
    /// Selected fields. Empty means `*`.
    pub fields: Vec<Field>,
    /// FROM source.
    pub from: Option<Source>,
    /// Joined sources, in order.
    pub joins: Vec<Join>,
    /// WHERE clause.
    pub where_clause: Option<Condition>,
    /// GROUP BY fragments.
    pub group_by: Vec<String>,
    /// HAVING fragment.
    pub having: Option<String>,
    /// ORDER BY fragments.
    pub order_by: Vec<String>,
    /// LIMIT clause.
    pub limit: Option<u64>,
}

/// A common table expression attached to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cte {
    /// Alias the CTE is visible under.
    pub name: String,
    /// Body SQL, without a statement terminator.
    pub sql: String,
}

/// A field in the SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The selected expression, verbatim.
    pub expr: String,
    /// Optional alias (AS name).
    pub alias: Option<String>,
}

/// A row source in FROM or JOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A table by name.
    Table(String),
    /// One of the query's own CTEs.
    CteRef(String),
    /// An inline SQL fragment used as a subquery.
    Derived(String),
    /// Any source under an explicit alias.
    Aliased {
        /// The aliased source.
        source: Box<Self>,
        /// The alias.
        alias: String,
    },
}

/// A joined source with its ON predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// The joined source.
    pub source: Source,
    /// The ON predicate, verbatim.
    pub on: String,
}

/// A boolean condition in WHERE.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`.
    Equals {
        /// Column expression.
        column: String,
        /// Compared value.
        value: Literal,
    },
    /// `column IS NULL`.
    IsNull(String),
    /// `column IN (values...)`.
    InList {
        /// Column expression.
        column: String,
        /// Accepted values.
        values: Vec<Literal>,
    },
    /// Half-open range `start <= column < end`; a missing bound is open.
    DateRange {
        /// Column expression.
        column: String,
        /// Inclusive lower bound.
        start: Option<Literal>,
        /// Exclusive upper bound.
        end: Option<Literal>,
    },
    /// Disjunction.
    Or(Vec<Self>),
    /// Conjunction.
    And(Vec<Self>),
    /// A raw boolean SQL fragment.
    Raw(String),
}

impl SelectQuery {
    /// Create an empty `SELECT *`.
    pub const fn new() -> Self {
        Self {
            ctes: Vec::new(),
            fields: Vec::new(),
            from: None,
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Set the FROM source.
    pub fn from(mut self, source: Source) -> Self {
        self.from = Some(source);
        self
    }

    /// Add a joined source.
    pub fn join(mut self, source: Source, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            source,
            on: on.into(),
        });
        self
    }

    /// Set the WHERE clause.
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Set the LIMIT.
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Whether a CTE with this alias is attached.
    pub fn has_cte(&self, name: &str) -> bool {
        self.ctes.iter().any(|cte| cte.name == name)
    }
}

impl Default for SelectQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Field {
    /// Create a field from an expression.
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    /// Create a field with an alias.
    pub fn with_alias(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }
}

impl Source {
    /// Put this source under `alias`, replacing any alias it already has.
    pub fn aliased(self, alias: impl Into<String>) -> Self {
        let source = match self {
            Self::Aliased { source, .. } => source,
            other => Box::new(other),
        };
        Self::Aliased {
            source,
            alias: alias.into(),
        }
    }
}

impl Condition {
    /// `column = value`.
    pub fn equals(column: impl Into<String>, value: Literal) -> Self {
        Self::Equals {
            column: column.into(),
            value,
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}
