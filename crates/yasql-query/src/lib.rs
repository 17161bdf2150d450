//! Query compiler for yasql.
//!
//! This crate turns the queries of a loaded [`Playbook`](yasql_core::Playbook)
//! into SQL text:
//!
//! - [`expand`] - templates, CTE-by-reference and `${name}` variables
//! - [`date`] - the `dt | ...` / `ts | ...` date expression grammar
//! - [`clause`] - select mappings into a [`SelectQuery`] AST
//! - [`emit`] - dialect-aware SQL emission
//! - [`render`] - the bounded pass loop driving a body to SQL
//!
//! # Example
//!
//! ```
//! use yasql_query::{RenderConfig, Renderer};
//!
//! let playbook = yasql_loader::load_str(
//!     r"
//! queries:
//!   - name: paid
//!     select:
//!       from: orders
//!       where:
//!         - status: paid
//! ",
//! )?;
//! let config = RenderConfig::new();
//! let sql = Renderer::new(&playbook, &config).render("paid")?;
//! assert_eq!(sql, "SELECT * FROM orders WHERE status = 'paid';");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod clause;
pub mod config;
pub mod date;
pub mod emit;
pub mod error;
pub mod expand;
pub mod render;

pub use ast::{Condition, Cte, Field, Join, Literal, SelectQuery, Source};
pub use config::{Clock, Dialect, RenderConfig, DEFAULT_MAX_PASSES};
pub use date::{is_date_expr, DateContext, DateResult, Sentinel};
pub use error::{ParseError, ParseErrorKind, RenderError};
pub use render::{CompiledQuery, RenderQuery, Renderer, Stage};
