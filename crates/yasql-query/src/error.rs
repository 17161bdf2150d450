//! Query error types.

use thiserror::Error;

/// Error returned when parsing a date expression fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at position {position} in `{input}`: {kind}")]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Position in the input where the error occurred.
    pub position: usize,
    /// The offending expression.
    pub input: String,
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// Syntax error with details.
    #[error("{0}")]
    SyntaxError(String),
    /// The expression is well formed but its value is not representable.
    #[error("date out of range")]
    OutOfRange,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, position: usize, input: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            input: input.into(),
        }
    }
}

/// Error returned when rendering a query fails.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No query with the given name.
    #[error("query not found: {0}")]
    NotFound(String),
    /// The template path does not resolve.
    #[error("template not found: {0}")]
    TemplateNotFound(String),
    /// A clause could not be split into its parts.
    #[error("syntax error in `{clause}`: {message}")]
    Syntax {
        /// The clause being compiled.
        clause: String,
        /// What was wrong.
        message: String,
    },
    /// A date expression failed to parse.
    #[error("invalid date expression: {0}")]
    Date(#[from] ParseError),
    /// A `${name}` reference names no variable.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    /// A composite variable was used inside text.
    #[error("variable `{name}` is a {type_name} and cannot be interpolated into text")]
    VariableNotScalar {
        /// The variable.
        name: String,
        /// Its actual type.
        type_name: &'static str,
    },
    /// Two CTEs of one query share an alias.
    #[error("duplicate CTE alias: {0}")]
    DuplicateCte(String),
    /// A clause has the wrong shape.
    #[error("invalid `{clause}` clause: {message}")]
    InvalidClause {
        /// The clause being compiled.
        clause: String,
        /// What was wrong.
        message: String,
    },
    /// The render loop ran out of passes.
    #[error("query did not converge within {passes} passes; last state: {state}")]
    NonConvergence {
        /// The pass budget that was exhausted.
        passes: usize,
        /// Debug rendering of the last intermediate state.
        state: String,
    },
    /// A CTE reference leads back to a query already being rendered.
    ///
    /// Holds the chain of query names, starting and ending at the repeat.
    #[error("cyclic CTE reference: {}", .0.join(" -> "))]
    CyclicCte(Vec<String>),
    /// A local time cannot be placed in the configured timezone.
    #[error("timezone error: {0}")]
    Timezone(String),
}

impl RenderError {
    pub(crate) fn invalid(clause: &str, message: impl Into<String>) -> Self {
        Self::InvalidClause {
            clause: clause.to_string(),
            message: message.into(),
        }
    }
}
